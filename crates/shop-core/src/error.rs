//! Error types for the marketplace core.
//!
//! [`ShopError`] is the whole client-facing taxonomy: its `Display` text
//! is exactly what goes back in an `ERR` response, so none of these ever
//! need to terminate a connection.

use thiserror::Error;

use crate::model::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    /// Any action other than LOGIN from an unauthenticated connection.
    #[error("You must sign in first to do this action!")]
    AuthRequired,

    /// LOGIN from a connection that is already signed in.
    #[error("You must log out first before signing in to another account!")]
    AlreadyAuthenticated,

    /// LOGIN for a name whose session is active on another connection.
    #[error("You already are logged in!")]
    AlreadyLoggedIn,

    #[error("Invalid command!")]
    UnknownCommand,

    /// `params` present but not a string.
    #[error("Invalid argument!")]
    MalformedArguments,

    #[error("Invalid argument count!")]
    ArityMismatch,

    /// Whitelisted action with no handler behind it. A configuration bug.
    #[error("Unexpected error: method '{0}' is not found!!!")]
    HandlerNotFound(String),

    #[error("Item doesn't exist in the shop!")]
    ItemNotFound,

    #[error("You already have that item!")]
    AlreadyOwned,

    #[error("You don't have this item!")]
    NotOwned,

    #[error("You don't have enough credits to buy this item")]
    InsufficientCredits,

    #[error("You must sign in before logging out")]
    NotLoggedIn,

    /// A session or handler referenced a user row that is not in the store.
    #[error("Unexpected error: user {0} does not exist")]
    UnknownUser(UserId),

    #[error("Unexpected error: credit balance would overflow")]
    CreditOverflow,

    #[error("Invalid credit bonus range: min {min}, max {max}, step {step}")]
    InvalidBonusRange { min: u64, max: u64, step: u64 },
}

/// Failures loading or saving the store snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
