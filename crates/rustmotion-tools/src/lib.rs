use clap::ValueEnum;
use rustmotion_client::ClientConfig;
use rustmotion_core::message::DeviceStatus;
use rustmotion_core::types::{DeviceType, Operation};
use std::net::IpAddr;

/// CLI-friendly motor commands.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OperationArg {
    Open,
    Close,
    Stop,
    Status,
}

impl OperationArg {
    pub const fn into_operation(self) -> Operation {
        match self {
            Self::Open => Operation::OpenUp,
            Self::Close => Operation::CloseDown,
            Self::Stop => Operation::Stop,
            Self::Status => Operation::StatusQuery,
        }
    }
}

/// CLI-friendly device types.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DeviceTypeArg {
    Blind,
    TopDownBottomUp,
    DoubleRoller,
}

impl DeviceTypeArg {
    pub fn into_device_type(self) -> DeviceType {
        match self {
            Self::Blind => DeviceType::Blind,
            Self::TopDownBottomUp => DeviceType::TopDownBottomUp,
            Self::DoubleRoller => DeviceType::DoubleRoller,
        }
    }
}

/// Client settings shared by the tools: an optional pinned gateway and key.
pub fn client_config(gateway: Option<IpAddr>, key: Option<String>) -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(ip) = gateway {
        config = config.with_gateway(ip);
    }
    if let Some(key) = key {
        config = config.with_key(key);
    }
    config
}

/// One-line human summary of a motor status.
pub fn describe_status(status: &DeviceStatus) -> String {
    let mut parts = Vec::new();
    match status.blind_type() {
        Some(kind) => parts.push(format!("{kind:?}")),
        None => parts.push(format!("type {}", status.blind_type_raw)),
    }
    if let Some(op) = status.operation() {
        parts.push(format!("operation {op:?}"));
    }
    if let Some(pos) = status.current_position {
        parts.push(format!("position {pos}"));
    }
    if let (Some(top), Some(bottom)) = (status.current_position_top, status.current_position_bottom)
    {
        parts.push(format!("top {top} bottom {bottom}"));
    }
    if let Some(angle) = status.current_angle {
        parts.push(format!("angle {angle}"));
    }
    if let Some(state) = status.current_state() {
        parts.push(format!("limits {state:?}"));
    }
    if let Some(battery) = status.battery() {
        parts.push(format!(
            "battery {:.2} V ({:.0}%)",
            battery.voltage,
            battery.percent * 100.0
        ));
    }
    if let Some(rssi) = status.rssi {
        parts.push(format!("rssi {rssi}"));
    }
    parts.join(", ")
}
