//! JSON shapes on the wire.
//!
//! Request (client → server):
//!
//! ```text
//! {"action": "BUY", "user_id": 3, "params": "sword"}
//! ```
//!
//! `user_id` and `params` may be missing or `null`.
//!
//! Responses (server → client), discriminated by `status`:
//!
//! ```text
//! {"status": "OK", "data": [...] | null, "message": "..." | null, "user_id": 3 | null}
//! {"status": "ERR", "message": "..."}
//! {"status": "LOGOUT"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shop_core::ResponseData;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    /// Missing is a protocol error, reported by the codec.
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub user_id: Option<u64>,

    /// Kept untyped so non-string arguments reach the dispatcher as
    /// "invalid" rather than failing the whole frame.
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum WireResponse {
    #[serde(rename = "OK")]
    Ok {
        data: Option<ResponseData>,
        message: Option<String>,
        user_id: Option<u64>,
    },

    #[serde(rename = "ERR")]
    Err { message: String },

    #[serde(rename = "LOGOUT")]
    Logout,
}
