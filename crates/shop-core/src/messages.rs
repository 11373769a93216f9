//! Logical request/response types.
//!
//! These are transport-agnostic: the JSON line codec lives in the
//! `shop-protocol` crate and maps to and from these.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{InventoryEntry, ShopItem, UserId};

/// The argument slot of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Params {
    /// Missing or `null`.
    #[default]
    Absent,

    /// A single string argument.
    Text(String),

    /// Present but not a string. Always rejected by the dispatcher.
    Invalid,
}

/// One client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, e.g. `"BUY"`.
    pub action: String,

    /// The id the client believes it is signed in as. Informational only:
    /// the dispatcher trusts the connection state instead.
    pub user_id: Option<UserId>,

    pub params: Params,
}

impl Request {
    pub fn new(action: impl Into<String>) -> Self {
        Request {
            action: action.into(),
            user_id: None,
            params: Params::Absent,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params = Params::Text(param.into());
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_user(mut self, uid: UserId) -> Self {
        self.user_id = Some(uid);
        self
    }
}

/// Payload of a successful reply.
///
/// Untagged on the wire; an empty list reads back as `Inventory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Inventory(Vec<InventoryEntry>),
    ShopItems(Vec<ShopItem>),
}

/// One reply. Exactly one of `OK`, `ERR` or `LOGOUT` on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok {
        data: Option<ResponseData>,
        message: Option<String>,
        user_id: Option<UserId>,
    },
    Err {
        message: String,
    },
    Logout,
}

impl Response {
    pub fn message(message: impl Into<String>) -> Self {
        Response::Ok {
            data: None,
            message: Some(message.into()),
            user_id: None,
        }
    }

    pub fn data(data: ResponseData) -> Self {
        Response::Ok {
            data: Some(data),
            message: None,
            user_id: None,
        }
    }

    pub fn error(err: impl fmt::Display) -> Self {
        Response::Err {
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Response::Err { .. })
    }

    /// Message text of an `OK` or `ERR` reply.
    pub fn text(&self) -> Option<&str> {
        match self {
            Response::Ok { message, .. } => message.as_deref(),
            Response::Err { message } => Some(message),
            Response::Logout => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Response::Ok { user_id, .. } => *user_id,
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&ResponseData> {
        match self {
            Response::Ok { data, .. } => data.as_ref(),
            _ => None,
        }
    }
}
