//! List the blinds behind a gateway and read each one.
//!
//! Usage:
//!   cargo run -p rustmotion-client --example list_devices

use rustmotion_client::{ClientConfig, GatewayClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Discover the gateway over multicast; replies switch us to unicast.
    let client = GatewayClient::connect(ClientConfig::default()).await?;

    let list = client.get_device_list().await?;
    println!(
        "Gateway {} (protocol {}), token {}",
        list.mac,
        list.protocol_version,
        list.token.as_deref().unwrap_or("-")
    );

    for status in client.read_all_devices().await? {
        let battery = status
            .data
            .battery()
            .map(|b| format!("{:.2} V ({:.0}%)", b.voltage, b.percent * 100.0))
            .unwrap_or_else(|| "-".into());
        println!(
            "{} {:<24} position {:>3}  battery {}",
            status.mac,
            status.device_type.name(),
            status
                .data
                .current_position
                .map_or_else(|| "-".into(), |p| p.to_string()),
            battery
        );
    }

    Ok(())
}
