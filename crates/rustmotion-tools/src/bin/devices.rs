use clap::Parser;
use rustmotion_client::GatewayClient;
use rustmotion_tools::client_config;
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(name = "motion-devices")]
struct Args {
    /// Gateway address; discovered over multicast when omitted.
    #[arg(long)]
    gateway: Option<IpAddr>,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = GatewayClient::connect(client_config(args.gateway, None)).await?;

    let list = match client.get_device_list().await {
        Ok(list) => list,
        Err(e) => {
            eprintln!("device list failed: {e}");
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    println!(
        "gateway {} protocol {} token {}",
        list.mac,
        list.protocol_version,
        list.token.as_deref().unwrap_or("-")
    );
    for device in list.devices() {
        println!("  {} {}", device.mac, device.device_type.name());
    }
    if let Some(ip) = client.seen_gateway() {
        println!("answered from {ip}");
    }
    Ok(())
}
