use super::{MessageType, WriteDeviceData};
use crate::msg_id::MessageId;
use crate::types::DeviceType;
use crate::EncodeError;
use serde::Serialize;

/// An outbound request, independent of the message ID it is sent under.
///
/// The same logical request is re-encoded with a fresh ID on every
/// transmission attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub msg_type: MessageType,
    pub mac: Option<String>,
    pub device_type: Option<DeviceType>,
    pub data: Option<WriteDeviceData>,
    pub access_token: Option<String>,
}

#[derive(Serialize)]
struct Frame<'a> {
    #[serde(rename = "msgType")]
    msg_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    mac: Option<&'a str>,
    #[serde(rename = "deviceType", skip_serializing_if = "Option::is_none")]
    device_type: Option<&'a DeviceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a WriteDeviceData>,
    #[serde(rename = "AccessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    #[serde(rename = "msgID")]
    msg_id: &'a MessageId,
}

impl Request {
    pub fn get_device_list() -> Self {
        Self {
            msg_type: MessageType::GetDeviceList,
            mac: None,
            device_type: None,
            data: None,
            access_token: None,
        }
    }

    pub fn read_device(mac: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            msg_type: MessageType::ReadDevice,
            mac: Some(mac.into()),
            device_type: Some(device_type),
            data: None,
            access_token: None,
        }
    }

    pub fn write_device(
        mac: impl Into<String>,
        device_type: DeviceType,
        data: WriteDeviceData,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            msg_type: MessageType::WriteDevice,
            mac: Some(mac.into()),
            device_type: Some(device_type),
            data: Some(data),
            access_token: Some(access_token.into()),
        }
    }

    /// Serializes the request as one JSON datagram carrying `msg_id`.
    pub fn encode(&self, msg_id: &MessageId) -> Result<Vec<u8>, EncodeError> {
        let frame = Frame {
            msg_type: self.msg_type,
            mac: self.mac.as_deref(),
            device_type: self.device_type.as_ref(),
            data: self.data.as_ref(),
            access_token: self.access_token.as_deref(),
            msg_id,
        };
        Ok(serde_json::to_vec(&frame)?)
    }
}
