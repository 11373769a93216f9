// crates/shop-protocol/src/json_codec.rs

//! Line codec.
//!
//! One JSON document per line. The functions here work on a single line
//! with the trailing `\n` already stripped (decode) or not yet appended
//! (encode); reading and writing the stream is the server's job.

use serde_json::Value;
use shop_core::{Params, Request, Response, UserId};
use thiserror::Error;

use crate::wire_types::{WireRequest, WireResponse};

/// Longest accepted frame, in bytes, excluding the newline.
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request has no action")]
    MissingAction,

    #[error("frame of {0} bytes exceeds the {max} byte limit", max = MAX_LINE_LEN)]
    LineTooLong(usize),
}

/// Parse one request line.
pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    check_len(line)?;

    let wire: WireRequest = serde_json::from_str(line)?;
    let action = wire.action.ok_or(ProtocolError::MissingAction)?;

    let params = match wire.params {
        Value::Null => Params::Absent,
        Value::String(text) => Params::Text(text),
        _ => Params::Invalid,
    };

    Ok(Request {
        action,
        user_id: wire.user_id.map(UserId),
        params,
    })
}

/// Serialize a request, for clients and tests.
///
/// `Params::Invalid` has no single wire form; it is sent as an empty
/// JSON object.
pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    let params = match &request.params {
        Params::Absent => Value::Null,
        Params::Text(text) => Value::String(text.clone()),
        Params::Invalid => Value::Object(serde_json::Map::new()),
    };

    let wire = WireRequest {
        action: Some(request.action.clone()),
        user_id: request.user_id.map(u64::from),
        params,
    };

    Ok(serde_json::to_string(&wire)?)
}

pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    let wire = match response {
        Response::Ok {
            data,
            message,
            user_id,
        } => WireResponse::Ok {
            data: data.clone(),
            message: message.clone(),
            user_id: user_id.map(u64::from),
        },
        Response::Err { message } => WireResponse::Err {
            message: message.clone(),
        },
        Response::Logout => WireResponse::Logout,
    };

    Ok(serde_json::to_string(&wire)?)
}

pub fn decode_response(line: &str) -> Result<Response, ProtocolError> {
    check_len(line)?;

    let wire: WireResponse = serde_json::from_str(line)?;
    let response = match wire {
        WireResponse::Ok {
            data,
            message,
            user_id,
        } => Response::Ok {
            data,
            message,
            user_id: user_id.map(UserId),
        },
        WireResponse::Err { message } => Response::Err { message },
        WireResponse::Logout => Response::Logout,
    };

    Ok(response)
}

fn check_len(line: &str) -> Result<(), ProtocolError> {
    if line.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong(line.len()));
    }
    Ok(())
}
