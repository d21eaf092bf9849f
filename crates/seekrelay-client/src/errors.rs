//! Client error types.
//!
//! Neither kind is fatal to the process: adapter failures are logged and
//! the seek ack is still sent, transport failures end the current
//! connection and feed the reconnect loop.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure talking to or launching the local media player.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The player's control port refused or reset the connection.
    #[error("cannot reach player at {addr}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Read or write on an established control connection failed.
    #[error("player i/o error: {0}")]
    Io(#[from] io::Error),
    /// The control port did not accept the connection in time.
    #[error("player did not answer within {0:?}")]
    Timeout(Duration),
    /// An external program could not be started.
    #[error("failed to launch {program}: {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}

/// Failure of the hub connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket handshake failed.
    #[error("connect failed: {0}")]
    Connect(#[source] Box<tungstenite::Error>),
    /// The WebSocket handshake did not finish in time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    /// The hub went away while a frame was being sent.
    #[error("connection closed")]
    Closed,
    /// Reading the next frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] Box<tungstenite::Error>),
}
