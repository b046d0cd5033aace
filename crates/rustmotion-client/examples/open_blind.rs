//! Open one blind.
//!
//! Usage:
//!   MOTION_KEY=<gateway key> cargo run -p rustmotion-client --example open_blind -- <mac>

use rustmotion_client::{ClientConfig, DeviceType, GatewayClient, Operation, WriteDeviceData};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mac = std::env::args().nth(1).ok_or("usage: open_blind <mac>")?;
    let key = std::env::var("MOTION_KEY")?;

    let client = GatewayClient::connect(ClientConfig::default().with_key(key)).await?;

    // The device list carries the session token the access token is derived from.
    client.get_device_list().await?;

    let ack = client
        .write_device(
            &mac,
            DeviceType::Blind,
            WriteDeviceData::operation(Operation::OpenUp),
            None,
        )
        .await?;
    println!("{} now reports operation {:?}", ack.mac, ack.data.operation());

    Ok(())
}
