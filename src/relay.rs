//! Reconnecting client for the IoTConnect relay.
//!
//! This module provides [`RelayClient`], the public face of the library. It
//! owns the connection lifecycle: connecting over a Unix or TCP stream,
//! registering, pushing telemetry, dispatching inbound commands, and
//! rebuilding the connection whenever it drops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      Unix socket / TCP      ┌───────────────────┐
//! │  local process   │ ◄──────────────────────────►│   relay server    │
//! │  (RelayClient)   │   newline-delimited JSON    │   (out of tree)   │
//! └──────────────────┘                             └───────────────────┘
//! ```
//!
//! Two background tasks run while the client is started: a reconnect
//! supervisor that re-dials the endpoint at a fixed interval whenever the
//! connection is down, and (while connected) one receive loop that
//! reassembles newline-delimited frames and dispatches command envelopes.
//!
//! # Protocol
//!
//! One JSON envelope per line (see [`crate::envelope`]):
//!
//! ```text
//! {"type":"register","client_id":"sensor-01"}
//! {"type":"telemetry","client_id":"sensor-01","data":{"temperature":25.5}}
//! {"type":"command","command_name":"Command_A","parameters":"42"}
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use iotc_relay_client::relay::{ClientConfig, RelayClient};
//!
//! let config = ClientConfig::new("tcp://127.0.0.1:8899", "sensor-01");
//! let client = RelayClient::new(config, |cmd| tracing::info!(?cmd, "command"))?;
//! client.start().await?;
//! ```

mod client;
mod connection;
mod framing;

pub use client::{ClientConfig, RelayClient, RelayError};

pub use crate::envelope::Command;
