//! Media-control adapter.
//!
//! The client only ever needs two things from the local player: run a text
//! command, and learn the media length. [`VlcRemote`] provides both over
//! VLC's `rc` interface, one TCP connection per command.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::errors::AdapterError;

const PROMPT: char = '>';
const LENGTH_COMMAND: &str = "get_length";

/// Text-protocol access to a local media player.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaControl: Send + Sync {
    /// Send one command and return the player's trimmed reply.
    async fn send_command(&self, command: &str) -> Result<String, AdapterError>;

    /// Total media length in seconds, or 0 when it cannot be determined.
    async fn get_duration(&self) -> u64 {
        match self.send_command(LENGTH_COMMAND).await {
            Ok(reply) => parse_length(&reply).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "could not query media length");
                0
            }
        }
    }
}

/// Read a `get_length` reply.
///
/// The first line made only of digits wins; anything else is `None`.
pub fn parse_length(reply: &str) -> Option<u64> {
    reply
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && l.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|l| l.parse().ok())
}

/// VLC `rc` interface client.
#[derive(Clone, Debug)]
pub struct VlcRemote {
    addr: String,
    prompt_timeout: Duration,
    idle_timeout: Duration,
}

impl VlcRemote {
    /// Talk to the `rc` interface at `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            prompt_timeout: Duration::from_secs(1),
            idle_timeout: Duration::from_millis(300),
        }
    }

    /// Override how long to wait for the greeting prompt and for a quiet
    /// line after the reply.
    #[must_use]
    pub fn with_timeouts(mut self, prompt: Duration, idle: Duration) -> Self {
        self.prompt_timeout = prompt;
        self.idle_timeout = idle;
        self
    }
}

#[async_trait]
impl MediaControl for VlcRemote {
    async fn send_command(&self, command: &str) -> Result<String, AdapterError> {
        let mut stream = tokio::time::timeout(self.prompt_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| AdapterError::Timeout(self.prompt_timeout))?
            .map_err(|source| AdapterError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        // greeting; a missing prompt is tolerated
        let _ = read_until_prompt(&mut stream, self.prompt_timeout).await?;
        stream.write_all(format!("{command}\n").as_bytes()).await?;
        let reply = read_until_prompt(&mut stream, self.idle_timeout).await?;

        let reply = reply.trim().to_string();
        debug!(command, reply = %reply, "player command");
        Ok(reply)
    }
}

/// Collect output until the next prompt, EOF, or `idle` of silence.
///
/// The prompt itself is not part of the result.
async fn read_until_prompt(stream: &mut TcpStream, idle: Duration) -> Result<String, AdapterError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match tokio::time::timeout(idle, stream.read(&mut chunk)).await {
            Err(_) | Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(body) = text.trim_end().strip_suffix(PROMPT) {
                    return Ok(body.to_string());
                }
            }
            Ok(Err(e)) => return Err(e.into()),
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
