//! Connection lifecycle for the relay client.
//!
//! One client owns at most one live connection. The pieces here run as
//! background tasks: `supervise` re-dials the endpoint while the client is
//! running and disconnected, and `receive_loop` (one instance per
//! connection) reads frames and dispatches command envelopes.
//!
//! All connection/run state lives in one group behind a single lock:
//! `connected` is true only while a writer half is stored, and the two are
//! always updated together. A generation counter ties each receive loop to
//! the connection it was spawned for, so an instance that loses a race with
//! a reconnect can never tear down its successor.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::envelope::{self, Command};
use crate::relay::client::{ClientConfig, RelayError};
use crate::relay::framing::FrameBuffer;
use crate::transport::{Endpoint, StreamReader, StreamWriter};

/// Size of a single read from the relay stream.
const READ_CHUNK_SIZE: usize = 4096;

pub(super) type CommandCallback = Box<dyn Fn(Command) + Send + Sync>;

/// State shared between the facade and both background tasks.
pub(super) struct Shared {
    pub(super) config: ClientConfig,
    pub(super) callback: CommandCallback,
    pub(super) state: Mutex<ConnState>,
}

/// The shared-state group. Every field is read and written under the one
/// lock in [`Shared::state`].
#[derive(Default)]
pub(super) struct ConnState {
    pub(super) running: bool,
    pub(super) connected: bool,
    pub(super) writer: Option<StreamWriter>,
    /// Present while running; cancelled by `stop()`. Parent of every
    /// per-connection token.
    pub(super) client_token: Option<CancellationToken>,
    /// Present while connected; cancelled when the connection is torn down.
    pub(super) conn_token: Option<CancellationToken>,
    /// Bumped on every successful connect.
    pub(super) generation: u64,
}

impl ConnState {
    /// Tear down the current connection in place. Dropping the writer half
    /// closes the socket, which also unblocks the peer; cancelling the
    /// connection token unblocks our own receive loop.
    pub(super) fn clear_connection(&mut self) {
        self.connected = false;
        self.writer = None;
        if let Some(token) = self.conn_token.take() {
            token.cancel();
        }
    }
}

/// Open the resolved transport, register, and spawn a receive loop.
///
/// On success the state transitions to Connected under the lock and exactly
/// one register envelope is written before the lock is released. The
/// register write is best-effort: a failure logs a warning and drops the
/// connection back down instead of failing the call, and no receive loop is
/// spawned for a connection already known dead.
pub(super) async fn connect(shared: &Arc<Shared>) -> Result<(), RelayError> {
    let endpoint = Endpoint::parse(&shared.config.address);
    let (reader, mut writer) = endpoint.connect().await.map_err(RelayError::Connect)?;
    let register = envelope::register_line(&shared.config.client_id)?;

    let mut state = shared.state.lock().await;

    // Stopped (or already reconnected) while dialing; do not resurrect.
    if !state.running || state.connected {
        return Ok(());
    }
    let client_token = match state.client_token.as_ref() {
        Some(token) => token.clone(),
        None => return Ok(()),
    };

    state.generation += 1;
    let generation = state.generation;
    state.connected = true;
    info!("connected to relay at {:?}", shared.config.address);

    if let Err(e) = writer.write_all(register.as_bytes()).await {
        warn!("failed to send register envelope: {e}");
        state.clear_connection();
        return Ok(());
    }

    let conn_token = client_token.child_token();
    state.conn_token = Some(conn_token.clone());
    state.writer = Some(writer);

    tokio::spawn(receive_loop(
        Arc::clone(shared),
        reader,
        conn_token,
        generation,
    ));

    Ok(())
}

/// Idempotent teardown of the current connection, if any.
pub(super) async fn disconnect(shared: &Shared) {
    let mut state = shared.state.lock().await;
    state.clear_connection();
}

/// Re-dial the endpoint at a fixed interval while the client is running and
/// disconnected. The wait is cancellable so `stop()` is not delayed by a
/// sleeping supervisor.
pub(super) async fn supervise(shared: Arc<Shared>, token: CancellationToken) {
    loop {
        let (running, connected) = {
            let state = shared.state.lock().await;
            (state.running, state.connected)
        };
        if !running || token.is_cancelled() {
            break;
        }

        if !connected {
            match connect(&shared).await {
                Ok(()) => {}
                Err(e) => debug!("reconnect attempt failed: {e}"),
            }
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(shared.config.reconnect_interval) => {}
        }
    }

    debug!("reconnect supervisor exited");
}

/// Read frames from one connection and dispatch command envelopes.
///
/// The callback runs synchronously on this task, once per decoded command,
/// in receipt order. EOF or a read error flips the state to Disconnected
/// (if this instance still owns the connection) and ends the loop; the
/// reconnect supervisor picks it up from there.
async fn receive_loop(
    shared: Arc<Shared>,
    mut reader: StreamReader,
    token: CancellationToken,
    generation: u64,
) {
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let read = tokio::select! {
            _ = token.cancelled() => break,
            read = reader.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => {
                info!("relay closed the connection");
                mark_disconnected(&shared, generation).await;
                break;
            }
            Err(e) => {
                debug!("read from relay failed: {e}");
                mark_disconnected(&shared, generation).await;
                break;
            }
            Ok(n) => {
                frames.extend(&chunk[..n]);
                while let Some(line) = frames.next_frame() {
                    match envelope::decode_command(&line) {
                        Some(command) => (shared.callback)(command),
                        // Malformed or non-command frames never tear down
                        // the connection.
                        None => trace!("ignoring non-command frame: {line:?}"),
                    }
                }
            }
        }
    }
}

/// Transition to Disconnected, but only if `generation` still owns the
/// connection.
async fn mark_disconnected(shared: &Shared, generation: u64) {
    let mut state = shared.state.lock().await;
    if state.generation == generation {
        state.clear_connection();
    }
}
