//! In-process document store.
//!
//! Three named collections (`users`, `shop_items`, `user_goods`), each
//! a [`Collection`] guarded by its own read/write lock, so every single
//! collection operation is atomic. Nothing spans collections: callers
//! that need a multi-step sequence serialize it themselves (see
//! [`Marketplace`](crate::marketplace::Marketplace)).
//!
//! A store may be bound to a JSON snapshot file:
//!
//! ```text
//! {
//!   "users":      { "next_id": 3, "rows": { "1": {"name": "alice", "credits": 40}, ... } },
//!   "shop_items": { "next_id": 2, "rows": { "1": {"name": "sword", "price": 20} } },
//!   "user_goods": { "next_id": 1, "rows": {} }
//! }
//! ```

use std::fs;
use std::hash::Hash;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::model::{ItemId, Ownership, OwnershipId, ShopItem, User, UserId};

/// A value type that lives in a [`Collection`].
pub trait Record: Clone + Serialize + DeserializeOwned {
    type Id: Copy + Eq + Hash + std::fmt::Debug + From<u64> + Into<u64>;
}

impl Record for User {
    type Id = UserId;
}

impl Record for ShopItem {
    type Id = ItemId;
}

impl Record for Ownership {
    type Id = OwnershipId;
}

/// A record together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T: Record> {
    pub id: T::Id,
    pub value: T,
}

impl<T: Record> Deref for Row<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Record")]
struct Table<T: Record> {
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    rows: IndexMap<u64, T>,
}

fn first_id() -> u64 {
    1
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Table {
            next_id: first_id(),
            rows: IndexMap::new(),
        }
    }
}

impl<T: Record> Table<T> {
    /// Keeps `next_id` ahead of every loaded key so ids are never reused,
    /// even if the file was edited by hand.
    fn repair_next_id(&mut self) {
        let past_max = self.rows.keys().max().map_or(first_id(), |max| max + 1);
        self.next_id = self.next_id.max(past_max);
    }

    fn row(&self, raw: u64, value: &T) -> Row<T> {
        Row {
            id: T::Id::from(raw),
            value: value.clone(),
        }
    }
}

/// One named collection of records.
#[derive(Debug)]
pub struct Collection<T: Record> {
    table: RwLock<Table<T>>,
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Collection {
            table: RwLock::new(Table::default()),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_table(mut table: Table<T>) -> Self {
        table.repair_next_id();
        Collection {
            table: RwLock::new(table),
        }
    }

    fn snapshot(&self) -> Table<T> {
        self.table.read().clone()
    }

    /// Point lookup by id.
    pub fn get(&self, id: T::Id) -> Option<Row<T>> {
        let table = self.table.read();
        let raw: u64 = id.into();
        table.rows.get(&raw).map(|value| table.row(raw, value))
    }

    /// First row (in insertion order) matching `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<Row<T>>
    where
        P: Fn(&T) -> bool,
    {
        let table = self.table.read();
        table
            .rows
            .iter()
            .find(|(_, value)| predicate(value))
            .map(|(raw, value)| table.row(*raw, value))
    }

    /// Every row matching `predicate`, in insertion order.
    pub fn search<P>(&self, predicate: P) -> Vec<Row<T>>
    where
        P: Fn(&T) -> bool,
    {
        let table = self.table.read();
        table
            .rows
            .iter()
            .filter(|(_, value)| predicate(value))
            .map(|(raw, value)| table.row(*raw, value))
            .collect()
    }

    pub fn all(&self) -> Vec<Row<T>> {
        self.search(|_| true)
    }

    /// Insert a new record and return the id assigned to it.
    pub fn insert(&self, value: T) -> T::Id {
        let mut table = self.table.write();
        let raw = table.next_id;
        table.next_id += 1;
        table.rows.insert(raw, value);
        T::Id::from(raw)
    }

    /// Mutate one record in place under the write lock.
    ///
    /// Returns `None` when the id is unknown, otherwise whatever `mutate`
    /// returned. A read-check-write done inside `mutate` cannot be
    /// interleaved with any other operation on this collection.
    pub fn update<F, R>(&self, id: T::Id, mutate: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let raw: u64 = id.into();
        let mut table = self.table.write();
        table.rows.get_mut(&raw).map(mutate)
    }

    /// Remove every row matching `predicate`; returns how many went.
    pub fn remove<P>(&self, predicate: P) -> usize
    where
        P: Fn(&T) -> bool,
    {
        let mut table = self.table.write();
        let before = table.rows.len();
        table.rows.retain(|_, value| !predicate(value));
        before - table.rows.len()
    }

    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    users: Table<User>,
    #[serde(default)]
    shop_items: Table<ShopItem>,
    #[serde(default)]
    user_goods: Table<Ownership>,
}

/// The three collections plus an optional snapshot file.
#[derive(Debug, Default)]
pub struct Store {
    pub users: Collection<User>,
    pub shop_items: Collection<ShopItem>,
    pub user_goods: Collection<Ownership>,

    path: Option<PathBuf>,

    /// Serializes snapshot writers so the last save sees the latest state.
    save_lock: Mutex<()>,
}

impl Store {
    /// A purely in-memory store; [`Store::save`] does nothing.
    pub fn in_memory() -> Self {
        Store::default()
    }

    /// Load the snapshot at `path`, or start empty if it does not exist yet.
    /// Either way the store is bound to `path` for later saves.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let snapshot = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Snapshot::default()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            Snapshot::default()
        };

        debug!(
            path = %path.display(),
            users = snapshot.users.rows.len(),
            items = snapshot.shop_items.rows.len(),
            "store opened"
        );

        Ok(Store {
            users: Collection::from_table(snapshot.users),
            shop_items: Collection::from_table(snapshot.shop_items),
            user_goods: Collection::from_table(snapshot.user_goods),
            path: Some(path),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Add catalog entries. Returns the ids in the same order.
    pub fn seed_items<I>(&self, items: I) -> Vec<ItemId>
    where
        I: IntoIterator<Item = ShopItem>,
    {
        items
            .into_iter()
            .map(|item| self.shop_items.insert(item))
            .collect()
    }

    /// Write the whole store to its snapshot file.
    ///
    /// Writes a sibling temp file first and renames it over the target.
    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _guard = self.save_lock.lock();

        let snapshot = Snapshot {
            users: self.users.snapshot(),
            shop_items: self.shop_items.snapshot(),
            user_goods: self.user_goods.snapshot(),
        };
        let text = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;

        Ok(())
    }
}
