use clap::Parser;
use rustmotion_client::GatewayClient;
use rustmotion_tools::{client_config, describe_status, DeviceTypeArg};
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(name = "motion-read")]
struct Args {
    #[arg(long)]
    gateway: Option<IpAddr>,
    /// Device to read; every device is read when omitted.
    #[arg(long)]
    mac: Option<String>,
    #[arg(long, value_enum, default_value_t = DeviceTypeArg::Blind)]
    device_type: DeviceTypeArg,
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = GatewayClient::connect(client_config(args.gateway, None)).await?;

    let result = match &args.mac {
        Some(mac) => client
            .read_device(mac, args.device_type.into_device_type())
            .await
            .map(|ack| vec![ack]),
        None => client.read_all_devices().await,
    };

    match result {
        Ok(acks) if args.json => println!("{}", serde_json::to_string_pretty(&acks)?),
        Ok(acks) => {
            for ack in acks {
                println!(
                    "{} {}: {}",
                    ack.mac,
                    ack.device_type.name(),
                    describe_status(&ack.data)
                );
            }
        }
        Err(e) => {
            eprintln!("read failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
