//! Records kept in the store.
//!
//! Ids are not part of the record bodies: the store assigns them and
//! hands them back alongside the value in a [`Row`](crate::store::Row).

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                $name(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Handle of a row in `users`. Stable for the lifetime of the store.
    UserId
);
id_type!(
    /// Handle of a row in `shop_items`.
    ItemId
);
id_type!(
    /// Handle of a row in `user_goods`.
    OwnershipId
);

/// A registered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique, never changes after signup.
    pub name: String,

    /// Current balance. Only the ledger writes this.
    pub credits: u64,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        User {
            name: name.into(),
            credits: 0,
        }
    }
}

/// Catalog entry. Seed data, never mutated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub name: String,
    pub price: u64,
}

impl ShopItem {
    pub fn new(name: impl Into<String>, price: u64) -> Self {
        ShopItem {
            name: name.into(),
            price,
        }
    }
}

/// Link between a user and an item they currently hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub user_id: UserId,
    pub item_id: ItemId,
}

/// One line of an inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub item_name: String,
}
