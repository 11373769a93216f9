//! Ownership rules: who holds which shop item.
//!
//! Buy and sell each touch two collections (`users` through the ledger,
//! then `user_goods`). The store gives no atomicity across the pair, so
//! the order is what keeps state consistent:
//! - buy debits first and inserts the ownership row only on success,
//! - sell credits (always succeeds) and then drops the row.
//! Both must run under the marketplace lock.

use crate::error::ShopError;
use crate::ledger::Ledger;
use crate::model::{InventoryEntry, Ownership, ShopItem, UserId};
use crate::store::{Row, Store};

pub struct InventoryManager<'a> {
    store: &'a Store,
    ledger: &'a Ledger,
}

impl<'a> InventoryManager<'a> {
    pub fn new(store: &'a Store, ledger: &'a Ledger) -> Self {
        InventoryManager { store, ledger }
    }

    /// The whole catalog.
    pub fn list_shop(&self) -> Vec<ShopItem> {
        self.store
            .shop_items
            .all()
            .into_iter()
            .map(|row| row.value)
            .collect()
    }

    /// Names of every item `uid` holds. Empty if nothing is owned.
    pub fn list_inventory(&self, uid: UserId) -> Vec<InventoryEntry> {
        self.store
            .user_goods
            .search(|o| o.user_id == uid)
            .into_iter()
            .filter_map(|owned| self.store.shop_items.get(owned.item_id))
            .map(|item| InventoryEntry {
                item_name: item.value.name,
            })
            .collect()
    }

    fn item_named(&self, name: &str) -> Result<Row<ShopItem>, ShopError> {
        self.store
            .shop_items
            .find(|item| item.name == name)
            .ok_or(ShopError::ItemNotFound)
    }

    fn owns(&self, ownership: Ownership) -> bool {
        self.store.user_goods.find(|o| *o == ownership).is_some()
    }

    pub fn buy(&self, uid: UserId, item_name: &str) -> Result<String, ShopError> {
        let item = self.item_named(item_name)?;
        let ownership = Ownership {
            user_id: uid,
            item_id: item.id,
        };
        if self.owns(ownership) {
            return Err(ShopError::AlreadyOwned);
        }

        let balance = self.ledger.apply_delta(self.store, uid, item.price, false)?;
        self.store.user_goods.insert(ownership);

        Ok(format!("Successfully bought the '{}'. {}", item_name, balance))
    }

    pub fn sell(&self, uid: UserId, item_name: &str) -> Result<String, ShopError> {
        let item = self.item_named(item_name)?;
        let ownership = Ownership {
            user_id: uid,
            item_id: item.id,
        };
        if !self.owns(ownership) {
            return Err(ShopError::NotOwned);
        }

        let balance = self.ledger.apply_delta(self.store, uid, item.price, true)?;
        self.store.user_goods.remove(|o| *o == ownership);

        Ok(format!("Successfully sold the '{}'. {}", item_name, balance))
    }
}
