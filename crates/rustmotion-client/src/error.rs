use rustmotion_core::{
    DecodeError, EncodeError, MessageType, TokenError, ValidationError, WaitHandle,
};
use rustmotion_datalink::DataLinkError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no gateway key configured and no access token supplied")]
    MissingKey,
    #[error("no session token known (call get_device_list first) and no access token supplied")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("request superseded by a newer request for {0}")]
    Superseded(WaitHandle),
    #[error("request timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("client closed")]
    Closed,
    #[error("unexpected response {0}")]
    UnexpectedResponse(MessageType),
}

/// Copies a datalink error so one failure can be reported to many waiters.
pub(crate) fn duplicate(err: &DataLinkError) -> DataLinkError {
    match err {
        DataLinkError::Io(io) => DataLinkError::Io(std::io::Error::new(io.kind(), io.to_string())),
        DataLinkError::FrameTooLarge => DataLinkError::FrameTooLarge,
        DataLinkError::Closed => DataLinkError::Closed,
    }
}
