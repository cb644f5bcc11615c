//! IoTConnect Relay Client Library
//!
//! This library provides the core components for talking to a local
//! IoTConnect relay endpoint:
//!
//! - `relay` - reconnecting client facade and connection engine
//! - `envelope` - wire envelope encode/decode for the line protocol
//! - `transport` - address resolution and stream transports (Unix/TCP)
//!
//! # Relay Module
//!
//! The `relay` module is the entry point for applications:
//!
//! ```ignore
//! use iotc_relay_client::relay::{ClientConfig, RelayClient};
//!
//! let config = ClientConfig::new("/tmp/iotconnect-relay.sock", "sensor-01");
//! let client = RelayClient::new(config, |cmd| {
//!     println!("command {} ({})", cmd.name, cmd.parameters);
//! })?;
//! client.start().await?;
//! client.send_telemetry(r#"{"temperature":25.5}"#).await?;
//! ```

pub mod envelope;
pub mod relay;
pub mod transport;
