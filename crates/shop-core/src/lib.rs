//! shop-core
//!
//! Pure marketplace logic:
//! - records (users, shop items, ownership rows)
//! - in-process document store with snapshot persistence
//! - session registry, credit ledger and inventory rules
//! - the per-connection command dispatcher

pub mod model;
pub mod store;
pub mod error;
pub mod session;
pub mod ledger;
pub mod inventory;
pub mod messages;
pub mod command;
pub mod marketplace;

pub use model::{InventoryEntry, ItemId, Ownership, OwnershipId, ShopItem, User, UserId};
pub use store::{Collection, Record, Row, Store};
pub use error::{ShopError, StoreError};
pub use session::SessionRegistry;
pub use ledger::{balance_message, BonusRange, Ledger};
pub use inventory::InventoryManager;
pub use messages::{Params, Request, Response, ResponseData};
pub use command::Command;
pub use marketplace::{ConnectionState, Marketplace};
