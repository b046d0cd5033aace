use clap::Parser;
use rustmotion_client::{GatewayClient, WriteDeviceData};
use rustmotion_tools::{client_config, describe_status, DeviceTypeArg, OperationArg};
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(name = "motion-write")]
struct Args {
    #[arg(long)]
    gateway: Option<IpAddr>,
    /// Gateway key used to derive the access token.
    #[arg(long, env = "MOTION_KEY", hide_env_values = true)]
    key: String,
    #[arg(long)]
    mac: String,
    #[arg(long, value_enum, default_value_t = DeviceTypeArg::Blind)]
    device_type: DeviceTypeArg,
    #[arg(long, value_enum, conflicts_with_all = ["position", "angle"])]
    operation: Option<OperationArg>,
    /// Target position, 0 (open) to 100 (closed).
    #[arg(long)]
    position: Option<i32>,
    /// Target angle, 0 to 180.
    #[arg(long)]
    angle: Option<i32>,
    /// Top rail position of a top-down/bottom-up blind.
    #[arg(long)]
    top: Option<i32>,
    /// Bottom rail position of a top-down/bottom-up blind.
    #[arg(long)]
    bottom: Option<i32>,
}

impl Args {
    fn data(&self) -> WriteDeviceData {
        WriteDeviceData {
            operation: self.operation.map(OperationArg::into_operation),
            target_position: self.position,
            target_angle: self.angle,
            target_position_top: self.top,
            target_position_bottom: self.bottom,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let data = args.data();
    if data == WriteDeviceData::default() {
        eprintln!("nothing to write: pass --operation, --position, --angle, --top or --bottom");
        std::process::exit(2);
    }

    let client = GatewayClient::connect(client_config(args.gateway, Some(args.key.clone()))).await?;
    // The device list carries the session token.
    client.get_device_list().await?;

    match client
        .write_device(&args.mac, args.device_type.into_device_type(), data, None)
        .await
    {
        Ok(ack) => {
            if let Some(result) = &ack.action_result {
                eprintln!("gateway refused write: {result}");
                std::process::exit(1);
            }
            println!("{}: {}", ack.mac, describe_status(&ack.data));
        }
        Err(e) => {
            eprintln!("write failed: {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}
