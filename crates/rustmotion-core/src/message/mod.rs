//! Gateway wire messages.
//!
//! Every datagram is a single UTF-8 JSON object tagged by `msgType`. The
//! client sends [`Request`]s and receives either an [`Acknowledgement`] for
//! an earlier request or an [`UnsolicitedEvent`] multicast by the gateway.

pub mod inbound;
pub mod request;
pub mod write;

pub use inbound::{
    decode_datagram, Acknowledgement, DeviceListEntry, DeviceStatus, GetDeviceListAck, Heartbeat,
    HeartbeatData, Inbound, ReadDeviceAck, Report, UnsolicitedEvent, WriteDeviceAck,
};
pub use request::Request;
pub use write::WriteDeviceData;

use core::fmt;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    GetDeviceList,
    ReadDevice,
    WriteDevice,
    GetDeviceListAck,
    ReadDeviceAck,
    WriteDeviceAck,
    Heartbeat,
    Report,
}

impl MessageType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetDeviceList => "GetDeviceList",
            Self::ReadDevice => "ReadDevice",
            Self::WriteDevice => "WriteDevice",
            Self::GetDeviceListAck => "GetDeviceListAck",
            Self::ReadDeviceAck => "ReadDeviceAck",
            Self::WriteDeviceAck => "WriteDeviceAck",
            Self::Heartbeat => "Heartbeat",
            Self::Report => "Report",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Some(match value {
            "GetDeviceList" => Self::GetDeviceList,
            "ReadDevice" => Self::ReadDevice,
            "WriteDevice" => Self::WriteDevice,
            "GetDeviceListAck" => Self::GetDeviceListAck,
            "ReadDeviceAck" => Self::ReadDeviceAck,
            "WriteDeviceAck" => Self::WriteDeviceAck,
            "Heartbeat" => Self::Heartbeat,
            "Report" => Self::Report,
            _ => return None,
        })
    }

    /// The acknowledgement type a gateway answers this request type with.
    pub const fn ack(self) -> Option<Self> {
        match self {
            Self::GetDeviceList => Some(Self::GetDeviceListAck),
            Self::ReadDevice => Some(Self::ReadDeviceAck),
            Self::WriteDevice => Some(Self::WriteDeviceAck),
            _ => None,
        }
    }

    pub const fn is_request(self) -> bool {
        self.ack().is_some()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Key pairing an acknowledgement with the request waiting for it.
///
/// Per-device acks are keyed by ack type and MAC, so at most one read and
/// one write may be in flight per device. Device-list acks are keyed by
/// type alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WaitHandle {
    ack_type: MessageType,
    mac: Option<String>,
}

impl WaitHandle {
    pub fn new(ack_type: MessageType, mac: Option<&str>) -> Self {
        let mac = match ack_type {
            MessageType::ReadDeviceAck | MessageType::WriteDeviceAck => mac.map(str::to_string),
            _ => None,
        };
        Self { ack_type, mac }
    }

    /// Handle under which the reply to a `request_type` request will arrive.
    ///
    /// Returns `None` for message types that are never sent as requests.
    pub fn for_request(request_type: MessageType, mac: Option<&str>) -> Option<Self> {
        request_type.ack().map(|ack| Self::new(ack, mac))
    }

    pub fn ack_type(&self) -> MessageType {
        self.ack_type
    }

    pub fn mac(&self) -> Option<&str> {
        self.mac.as_deref()
    }
}

impl fmt::Display for WaitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mac {
            Some(mac) => write!(f, "{}{}", self.ack_type, mac),
            None => write!(f, "{}", self.ack_type),
        }
    }
}
