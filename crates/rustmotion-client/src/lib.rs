//! Async client for motorized blind gateways.
//!
//! [`GatewayClient`] sends requests, retries them on an ascending backoff,
//! pairs replies with the requests that caused them and fans out
//! heartbeats and reports to subscribers.

pub mod client;
pub mod config;
mod correlator;
pub mod error;
pub mod events;
pub mod retry;
mod session;

pub use client::GatewayClient;
pub use config::ClientConfig;
pub use error::{AuthError, ClientError};
pub use events::{Notification, Subscription};
pub use retry::RetryPolicy;
pub use rustmotion_core::message::{
    DeviceListEntry, DeviceStatus, GetDeviceListAck, Heartbeat, ReadDeviceAck, Report,
    WriteDeviceAck, WriteDeviceData,
};
pub use rustmotion_core::types::{DeviceType, Operation};
pub use rustmotion_datalink::UdpTransport;
