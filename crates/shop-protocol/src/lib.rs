//! shop-protocol
//!
//! Wire-level encoding/decoding for the game shop server.
//!
//! Turns logical `shop_core::Request` / `Response` values into JSON
//! lines and back again.
//!
//! - [`wire_types`] : the JSON shapes as serde structs
//! - [`json_codec`] : line encode/decode for both directions

pub mod wire_types;
pub mod json_codec;

pub use json_codec::{
    ProtocolError,
    decode_request,
    encode_request,
    decode_response,
    encode_response,
    MAX_LINE_LEN,
};
