//! Active-session bookkeeping.

use std::collections::HashSet;

use crate::error::ShopError;
use crate::model::UserId;
use crate::store::Store;

/// The set of currently signed-in user ids.
///
/// Lives in memory only. Callers hold the marketplace lock around every
/// access, so the registry itself carries no synchronization.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    active: HashSet<UserId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// True iff `uid` is active and still backed by a user row.
    pub fn is_authenticated(&self, store: &Store, uid: UserId) -> bool {
        self.active.contains(&uid) && store.users.get(uid).is_some()
    }

    pub fn contains(&self, uid: UserId) -> bool {
        self.active.contains(&uid)
    }

    /// Returns false if `uid` was already active.
    pub fn add(&mut self, uid: UserId) -> bool {
        self.active.insert(uid)
    }

    pub fn remove(&mut self, uid: UserId) -> Result<(), ShopError> {
        if self.active.remove(&uid) {
            Ok(())
        } else {
            Err(ShopError::NotLoggedIn)
        }
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
