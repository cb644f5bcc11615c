//! Public facade for the relay client.
//!
//! `RelayClient` holds the configuration and the shared connection state,
//! and exposes the start/stop/send/is-connected surface. Transport and
//! protocol failures in the background never surface here directly; callers
//! observe connectivity through [`RelayClient::is_connected`] and the return
//! value of [`RelayClient::send_telemetry`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::value::RawValue;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::envelope::{self, Command};
use crate::relay::connection::{self, ConnState, Shared};

/// Maximum length of the relay address string, in bytes.
pub const MAX_ADDRESS_LEN: usize = 256;

/// Maximum length of the client identifier, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 64;

/// Default wait between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Relay client error types.
///
/// The `Display` text is the stable human-readable form of each code.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport-level allocation or task launch failure.
    #[error("socket error: {0}")]
    Socket(#[source] std::io::Error),

    /// Failed to resolve or connect to the relay endpoint.
    #[error("connection error: {0}")]
    Connect(#[source] std::io::Error),

    /// A write to the relay failed; the connection has been marked down.
    #[error("send error: {0}")]
    Send(#[source] std::io::Error),

    /// The telemetry payload is not usable JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The operation requires a live connection.
    #[error("not connected to relay")]
    Disconnected,

    /// Malformed configuration.
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),
}

/// Client configuration, immutable once the client is created.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay address: a socket path, or `tcp://host:port`.
    pub address: String,
    /// Identifier announced in the register handshake after every connect.
    pub client_id: String,
    /// Wait between reconnect attempts while disconnected.
    pub reconnect_interval: Duration,
}

impl ClientConfig {
    pub fn new(address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            client_id: client_id.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Override the reconnect interval (default 5 seconds).
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    fn validate(&self) -> Result<(), RelayError> {
        if self.address.is_empty() {
            return Err(RelayError::InvalidParam("address must not be empty"));
        }
        if self.address.len() > MAX_ADDRESS_LEN {
            return Err(RelayError::InvalidParam("address exceeds maximum length"));
        }
        if self.client_id.is_empty() {
            return Err(RelayError::InvalidParam("client_id must not be empty"));
        }
        if self.client_id.len() > MAX_CLIENT_ID_LEN {
            return Err(RelayError::InvalidParam("client_id exceeds maximum length"));
        }
        Ok(())
    }
}

/// Reconnecting relay client.
///
/// Cheap to share: internally an `Arc` around the connection state, so the
/// client can be cloned across tasks. Dropping the last handle after
/// [`RelayClient::stop`] releases everything; background tasks hold their
/// own references and exit promptly once stopped, so teardown never races
/// destruction.
#[derive(Clone)]
pub struct RelayClient {
    shared: Arc<Shared>,
}

impl RelayClient {
    /// Create a client. No connection is attempted until [`start`].
    ///
    /// `on_command` runs on the client's receive task, once per inbound
    /// command envelope, in receipt order for a given connection. A slow
    /// callback delays processing of subsequent frames. It must not block
    /// on [`stop`] from within itself.
    ///
    /// Fails with [`RelayError::InvalidParam`] when the address or client
    /// id is empty or exceeds its maximum length.
    ///
    /// [`start`]: RelayClient::start
    /// [`stop`]: RelayClient::stop
    pub fn new<F>(config: ClientConfig, on_command: F) -> Result<Self, RelayError>
    where
        F: Fn(Command) + Send + Sync + 'static,
    {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                callback: Box::new(on_command),
                state: Mutex::new(ConnState::default()),
            }),
        })
    }

    /// Start the client: one immediate connect attempt, then background
    /// reconnection for as long as the client is running.
    ///
    /// A failed initial attempt is logged, not returned; the supervisor
    /// keeps retrying at the configured interval. Calling `start` on a
    /// running client is a no-op.
    pub async fn start(&self) -> Result<(), RelayError> {
        let token = {
            let mut state = self.shared.state.lock().await;
            if state.running {
                return Ok(());
            }
            state.running = true;
            let token = CancellationToken::new();
            state.client_token = Some(token.clone());
            token
        };

        match connection::connect(&self.shared).await {
            Ok(()) => {}
            Err(e) => warn!("initial connection failed; will retry in background: {e}"),
        }

        tokio::spawn(connection::supervise(Arc::clone(&self.shared), token));

        Ok(())
    }

    /// Stop the client and tear down the connection.
    ///
    /// Idempotent. Both background tasks observe the stop promptly: the
    /// supervisor's wait and the receive loop's read are cancelled rather
    /// than left to expire.
    pub async fn stop(&self) {
        {
            let mut state = self.shared.state.lock().await;
            if !state.running && state.client_token.is_none() {
                return;
            }
            state.running = false;
            if let Some(token) = state.client_token.take() {
                token.cancel();
            }
        }

        connection::disconnect(&self.shared).await;
        info!("relay client stopped");
    }

    /// Whether the client currently holds a live connection.
    pub async fn is_connected(&self) -> bool {
        self.shared.state.lock().await.connected
    }

    /// Send one telemetry envelope carrying `json_data` verbatim.
    ///
    /// Fails with [`RelayError::Disconnected`] when no connection is live
    /// (nothing is written), with [`RelayError::Json`] when `json_data` is
    /// not valid JSON, and with [`RelayError::Send`] when the write fails —
    /// in which case the connection is marked down and the supervisor will
    /// rebuild it. There is no partial-write retry.
    pub async fn send_telemetry(&self, json_data: &str) -> Result<(), RelayError> {
        let mut state = self.shared.state.lock().await;
        if !state.connected {
            return Err(RelayError::Disconnected);
        }

        let data = RawValue::from_string(json_data.to_owned())?;
        let line = envelope::telemetry_line(&self.shared.config.client_id, &data)?;
        write_line(&mut state, &line).await
    }

    /// Send one telemetry envelope from a structured payload.
    pub async fn send_telemetry_value(&self, value: &serde_json::Value) -> Result<(), RelayError> {
        let mut state = self.shared.state.lock().await;
        if !state.connected {
            return Err(RelayError::Disconnected);
        }

        let data = serde_json::value::to_raw_value(value)?;
        let line = envelope::telemetry_line(&self.shared.config.client_id, &data)?;
        write_line(&mut state, &line).await
    }
}

/// Write one encoded line on the live connection. Caller holds the lock and
/// has already checked `connected`.
async fn write_line(state: &mut ConnState, line: &str) -> Result<(), RelayError> {
    let Some(writer) = state.writer.as_mut() else {
        // Connected without a writer would violate the state invariant;
        // repair by dropping to Disconnected.
        state.clear_connection();
        return Err(RelayError::Disconnected);
    };

    if let Err(e) = writer.write_all(line.as_bytes()).await {
        warn!("telemetry write failed; marking connection down: {e}");
        state.clear_connection();
        return Err(RelayError::Send(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_config() -> ClientConfig {
        ClientConfig::new("/tmp/iotc-relay-client-test.sock", "test-client")
    }

    #[test]
    fn create_rejects_empty_address() {
        let result = RelayClient::new(ClientConfig::new("", "id"), |_| {});
        assert!(matches!(result, Err(RelayError::InvalidParam(_))));
    }

    #[test]
    fn create_rejects_empty_client_id() {
        let result = RelayClient::new(ClientConfig::new("/tmp/x.sock", ""), |_| {});
        assert!(matches!(result, Err(RelayError::InvalidParam(_))));
    }

    #[test]
    fn create_rejects_overlong_address() {
        let address = "/tmp/".to_owned() + &"a".repeat(MAX_ADDRESS_LEN);
        let result = RelayClient::new(ClientConfig::new(address, "id"), |_| {});
        assert!(matches!(result, Err(RelayError::InvalidParam(_))));
    }

    #[test]
    fn create_rejects_overlong_client_id() {
        let id = "c".repeat(MAX_CLIENT_ID_LEN + 1);
        let result = RelayClient::new(ClientConfig::new("/tmp/x.sock", id), |_| {});
        assert!(matches!(result, Err(RelayError::InvalidParam(_))));
    }

    #[test]
    fn create_then_drop_without_start() {
        let client = RelayClient::new(noop_config(), |_| {}).expect("valid config");
        drop(client);
    }

    #[test]
    fn config_reconnect_interval_default_and_override() {
        let config = noop_config();
        assert_eq!(config.reconnect_interval, DEFAULT_RECONNECT_INTERVAL);

        let config = config.with_reconnect_interval(Duration::from_millis(100));
        assert_eq!(config.reconnect_interval, Duration::from_millis(100));
    }

    #[test]
    fn error_display_text() {
        assert_eq!(RelayError::Disconnected.to_string(), "not connected to relay");
        assert_eq!(
            RelayError::InvalidParam("address must not be empty").to_string(),
            "invalid parameter: address must not be empty"
        );
    }

    #[tokio::test]
    async fn send_before_start_reports_disconnected() {
        let client = RelayClient::new(noop_config(), |_| {}).expect("valid config");

        assert!(!client.is_connected().await);
        let result = client.send_telemetry(r#"{"temperature":25.5}"#).await;
        assert!(matches!(result, Err(RelayError::Disconnected)));
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let client = RelayClient::new(noop_config(), |_| {}).expect("valid config");
        client.stop().await;
        client.stop().await;
        assert!(!client.is_connected().await);
    }
}
