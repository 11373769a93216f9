//! Shared types for the shop TCP server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for accepted connections
//! - `ClientRegistry`: who is connected right now
//! - `SharedMarketplace`: the one marketplace every session talks to

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use shop_core::Marketplace;
use tokio::sync::RwLock;

/// Identifier for an accepted connection.
///
/// Opaque and unique over the lifetime of the process. Unrelated to
/// the user id a connection may sign in as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connected clients and their peer addresses.
pub type ClientRegistry = Arc<RwLock<HashMap<ClientId, SocketAddr>>>;

pub type SharedMarketplace = Arc<Marketplace>;
