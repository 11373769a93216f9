//! shop-server
//!
//! Multi-client async TCP server for the game shop.

pub mod config;
pub mod types;
pub mod server;
pub mod session;
