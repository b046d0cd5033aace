use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons an inbound datagram was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("datagram is not valid utf-8")]
    InvalidUtf8,
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("datagram is not a json object")]
    NotAnObject,
    #[error("missing msgType")]
    MissingMessageType,
    #[error("unrecognized msgType {0:?}")]
    UnknownMessageType(String),
    #[error("unexpected request msgType {0:?} on inbound path")]
    UnexpectedRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid key length {0} (expected 16 bytes)")]
    InvalidKeyLength(usize),
    #[error("invalid token length {0} (expected a non-zero multiple of 16 bytes)")]
    InvalidTokenLength(usize),
}

/// An out-of-range field in a write request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} {value} (expected {min}..={max})")]
pub struct ValidationError {
    pub field: &'static str,
    pub value: i32,
    pub min: i32,
    pub max: i32,
}
