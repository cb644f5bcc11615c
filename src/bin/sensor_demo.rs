//! Synthetic sensor demo for the relay client.
//!
//! Generates a sample every five seconds and pushes it as telemetry while
//! the relay is reachable, printing any commands the relay sends back.
//!
//! ```bash
//! sensor-demo [address] [client-id]
//! sensor-demo /tmp/iotconnect-relay.sock sensor-demo-01
//! sensor-demo tcp://127.0.0.1:8899 sensor-demo-01
//! ```

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iotc_relay_client::relay::{ClientConfig, Command, RelayClient};

const DEFAULT_ADDRESS: &str = "/tmp/iotconnect-relay.sock";
const DEFAULT_CLIENT_ID: &str = "sensor-demo";

/// Seconds between telemetry samples.
const SAMPLE_PERIOD: Duration = Duration::from_secs(5);

fn handle_command(cmd: Command) {
    info!("command received: {}", cmd.name);

    match cmd.name.as_str() {
        "Command_A" => info!("executing protocol for Command_A with parameters: {}", cmd.parameters),
        "Command_B" => info!("executing protocol for Command_B with parameters: {}", cmd.parameters),
        other => warn!("command not recognized: {other}"),
    }
}

/// Synthetic sample: a slow temperature wave plus a humidity counterpart.
fn sample(tick: u64) -> (f64, f64) {
    let phase = tick as f64 * 0.3;
    let temperature = 22.0 + 3.0 * phase.sin();
    let humidity = 55.0 + 10.0 * (phase / 2.0).cos();
    (temperature, humidity)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut args = std::env::args().skip(1);
    let address = args.next().unwrap_or_else(|| DEFAULT_ADDRESS.to_owned());
    let client_id = args.next().unwrap_or_else(|| DEFAULT_CLIENT_ID.to_owned());

    info!("starting sensor demo: relay={address} client_id={client_id}");

    let config = ClientConfig::new(address, client_id);
    let client = RelayClient::new(config, handle_command)?;
    client.start().await?;

    let mut ticker = tokio::time::interval(SAMPLE_PERIOD);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("exiting gracefully...");
                break;
            }
            _ = ticker.tick() => {
                let (temperature, humidity) = sample(tick);
                tick += 1;

                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
                info!("[{timestamp}] temperature: {temperature:.2}, humidity: {humidity:.2}");

                if !client.is_connected().await {
                    info!("  -> not connected - sample generated locally only");
                    continue;
                }

                let payload = json!({
                    "temperature": (temperature * 100.0).round() / 100.0,
                    "humidity": (humidity * 100.0).round() / 100.0,
                    "timestamp": timestamp,
                });
                match client.send_telemetry_value(&payload).await {
                    Ok(()) => info!("  -> telemetry sent to relay"),
                    Err(e) => warn!("  -> failed to send telemetry: {e}"),
                }
            }
        }
    }

    client.stop().await;
    Ok(())
}
