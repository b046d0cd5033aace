//! Wire protocol for motorized blind gateways in pure Rust.
//!
//! `rustmotion-core` holds everything about the gateway protocol that does
//! not touch a socket: the JSON request and acknowledgement shapes, the
//! inbound datagram decoder, wait-handle derivation used to pair replies
//! with requests, the AES access-token derivation, and the monotonic
//! message-ID generator. It forms the foundation of the rustmotion crate
//! family.

/// Error types for encoding, decoding, validation and token derivation.
pub mod error;
/// Request, acknowledgement and event messages plus the datagram decoder.
pub mod message;
/// Monotonic message-identifier generation.
pub mod msg_id;
/// Access-token derivation from the gateway key and session token.
pub mod token;
/// Device types, status enumerations and battery helpers.
pub mod types;

pub use error::{DecodeError, EncodeError, TokenError, ValidationError};
pub use message::{decode_datagram, Inbound, MessageType, WaitHandle};
pub use msg_id::{Clock, MessageId, MessageIdGenerator, SystemClock};
pub use token::access_token;
