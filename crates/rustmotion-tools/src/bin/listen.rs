use clap::Parser;
use rustmotion_client::GatewayClient;
use rustmotion_tools::{client_config, describe_status};
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(name = "motion-listen")]
struct Args {
    #[arg(long)]
    gateway: Option<IpAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let client = GatewayClient::connect(client_config(args.gateway, None)).await?;
    let mut heartbeats = client.subscribe_heartbeats();
    let mut reports = client.subscribe_reports();
    let mut errors = client.subscribe_errors();

    println!("Listening for heartbeats and reports (Ctrl+C to stop)...");
    loop {
        tokio::select! {
            Some(hb) = heartbeats.recv() => println!(
                "HEARTBEAT from {}: {} state={:?} devices={} rssi={}",
                hb.source,
                hb.message.mac,
                hb.message.data.current_state(),
                hb.message.data.number_of_devices,
                hb.message.data.rssi
            ),
            Some(report) = reports.recv() => println!(
                "REPORT from {}: {} {}",
                report.source,
                report.message.mac,
                describe_status(&report.message.data)
            ),
            Some(err) = errors.recv() => eprintln!("error: {err}"),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    client.close();
    Ok(())
}
