use super::{MessageType, WaitHandle};
use crate::types::{
    battery_info, BatteryInfo, BlindType, CurrentState, DeviceType, LimitsState, Operation,
    VoltageMode, WirelessMode,
};
use crate::DecodeError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListEntry {
    pub mac: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetDeviceListAck {
    pub mac: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(rename = "ProtocolVersion", default)]
    pub protocol_version: String,
    /// Session token consumed by access-token derivation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub data: Vec<DeviceListEntry>,
}

impl GetDeviceListAck {
    /// Devices behind the gateway, without the gateway's own entry.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceListEntry> {
        self.data
            .iter()
            .filter(|d| d.device_type != DeviceType::Gateway)
    }
}

/// Motor status as reported by reads, writes and reports.
///
/// Single-motor devices fill the plain fields, top-down/bottom-up devices
/// the `_top`/`_bottom` ones. Enumerated values stay raw on the wire; the
/// accessor methods map them to typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceStatus {
    #[serde(rename = "type")]
    pub blind_type_raw: u8,
    #[serde(rename = "operation", skip_serializing_if = "Option::is_none")]
    pub operation_raw: Option<u8>,
    #[serde(rename = "currentPosition", skip_serializing_if = "Option::is_none")]
    pub current_position: Option<i32>,
    #[serde(rename = "currentAngle", skip_serializing_if = "Option::is_none")]
    pub current_angle: Option<i32>,
    #[serde(rename = "currentState", skip_serializing_if = "Option::is_none")]
    pub current_state_raw: Option<u8>,
    #[serde(rename = "voltageMode", skip_serializing_if = "Option::is_none")]
    pub voltage_mode_raw: Option<u8>,
    #[serde(rename = "batteryLevel", skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u32>,
    #[serde(rename = "wirelessMode", skip_serializing_if = "Option::is_none")]
    pub wireless_mode_raw: Option<u8>,
    #[serde(rename = "RSSI", skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exist_subid: Option<u32>,
    #[serde(rename = "operation_T", skip_serializing_if = "Option::is_none")]
    pub operation_top_raw: Option<u8>,
    #[serde(rename = "operation_B", skip_serializing_if = "Option::is_none")]
    pub operation_bottom_raw: Option<u8>,
    #[serde(rename = "currentPosition_T", skip_serializing_if = "Option::is_none")]
    pub current_position_top: Option<i32>,
    #[serde(rename = "currentPosition_B", skip_serializing_if = "Option::is_none")]
    pub current_position_bottom: Option<i32>,
    #[serde(rename = "currentState_T", skip_serializing_if = "Option::is_none")]
    pub current_state_top_raw: Option<u8>,
    #[serde(rename = "currentState_B", skip_serializing_if = "Option::is_none")]
    pub current_state_bottom_raw: Option<u8>,
    #[serde(rename = "batteryLevel_T", skip_serializing_if = "Option::is_none")]
    pub battery_level_top: Option<u32>,
    #[serde(rename = "batteryLevel_B", skip_serializing_if = "Option::is_none")]
    pub battery_level_bottom: Option<u32>,
}

impl DeviceStatus {
    pub fn blind_type(&self) -> Option<BlindType> {
        BlindType::from_u8(self.blind_type_raw)
    }

    pub fn operation(&self) -> Option<Operation> {
        self.operation_raw.and_then(Operation::from_u8)
    }

    pub fn current_state(&self) -> Option<LimitsState> {
        self.current_state_raw.and_then(LimitsState::from_u8)
    }

    pub fn voltage_mode(&self) -> Option<VoltageMode> {
        self.voltage_mode_raw.and_then(VoltageMode::from_u8)
    }

    pub fn wireless_mode(&self) -> Option<WirelessMode> {
        self.wireless_mode_raw.and_then(WirelessMode::from_u8)
    }

    pub fn battery(&self) -> Option<BatteryInfo> {
        self.battery_level.map(battery_info)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadDeviceAck {
    pub mac: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub data: DeviceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteDeviceAck {
    pub mac: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        rename = "msgID",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub msg_id: Option<String>,
    /// Set by the gateway when the write was refused.
    #[serde(
        rename = "actionResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub action_result: Option<String>,
    #[serde(default)]
    pub data: DeviceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatData {
    #[serde(rename = "currentState")]
    pub current_state_raw: u8,
    #[serde(rename = "numberOfDevices")]
    pub number_of_devices: u32,
    #[serde(rename = "RSSI")]
    pub rssi: i32,
}

impl HeartbeatData {
    pub fn current_state(&self) -> Option<CurrentState> {
        CurrentState::from_u8(self.current_state_raw)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub mac: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub data: HeartbeatData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub mac: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub data: DeviceStatus,
}

/// A reply correlated to exactly one outstanding request.
#[derive(Debug, Clone, PartialEq)]
pub enum Acknowledgement {
    GetDeviceList(GetDeviceListAck),
    ReadDevice(ReadDeviceAck),
    WriteDevice(WriteDeviceAck),
}

impl Acknowledgement {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Self::GetDeviceList(_) => MessageType::GetDeviceListAck,
            Self::ReadDevice(_) => MessageType::ReadDeviceAck,
            Self::WriteDevice(_) => MessageType::WriteDeviceAck,
        }
    }

    pub fn mac(&self) -> &str {
        match self {
            Self::GetDeviceList(ack) => &ack.mac,
            Self::ReadDevice(ack) => &ack.mac,
            Self::WriteDevice(ack) => &ack.mac,
        }
    }

    pub fn wait_handle(&self) -> WaitHandle {
        WaitHandle::new(self.msg_type(), Some(self.mac()))
    }
}

/// Gateway traffic not tied to any request.
#[derive(Debug, Clone, PartialEq)]
pub enum UnsolicitedEvent {
    Heartbeat(Heartbeat),
    Report(Report),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Ack(Acknowledgement),
    Event(UnsolicitedEvent),
}

impl Inbound {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Self::Ack(ack) => ack.msg_type(),
            Self::Event(UnsolicitedEvent::Heartbeat(_)) => MessageType::Heartbeat,
            Self::Event(UnsolicitedEvent::Report(_)) => MessageType::Report,
        }
    }

    /// Session token carried by this message, if any.
    pub fn session_token(&self) -> Option<&str> {
        match self {
            Self::Ack(Acknowledgement::GetDeviceList(ack)) => ack.token.as_deref(),
            Self::Ack(Acknowledgement::ReadDevice(ack)) => ack.token.as_deref(),
            Self::Ack(Acknowledgement::WriteDevice(ack)) => ack.token.as_deref(),
            Self::Event(UnsolicitedEvent::Heartbeat(hb)) => hb.token.as_deref(),
            Self::Event(UnsolicitedEvent::Report(report)) => report.token.as_deref(),
        }
    }
}

/// Decodes one inbound datagram.
pub fn decode_datagram(frame: &[u8]) -> Result<Inbound, DecodeError> {
    let text = core::str::from_utf8(frame).map_err(|_| DecodeError::InvalidUtf8)?;
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    let tag = value
        .get("msgType")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingMessageType)?;
    let msg_type =
        MessageType::from_wire(tag).ok_or_else(|| DecodeError::UnknownMessageType(tag.into()))?;

    let inbound = match msg_type {
        MessageType::GetDeviceListAck => {
            Inbound::Ack(Acknowledgement::GetDeviceList(serde_json::from_value(value)?))
        }
        MessageType::ReadDeviceAck => {
            Inbound::Ack(Acknowledgement::ReadDevice(serde_json::from_value(value)?))
        }
        MessageType::WriteDeviceAck => {
            Inbound::Ack(Acknowledgement::WriteDevice(serde_json::from_value(value)?))
        }
        MessageType::Heartbeat => {
            Inbound::Event(UnsolicitedEvent::Heartbeat(serde_json::from_value(value)?))
        }
        MessageType::Report => {
            Inbound::Event(UnsolicitedEvent::Report(serde_json::from_value(value)?))
        }
        MessageType::GetDeviceList | MessageType::ReadDevice | MessageType::WriteDevice => {
            return Err(DecodeError::UnexpectedRequest(msg_type.as_str().into()));
        }
    };
    Ok(inbound)
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
