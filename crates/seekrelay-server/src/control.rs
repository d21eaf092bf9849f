//! Operator command surface.
//!
//! [`RelayControl`] is what an operator-facing front end talks to. The hub
//! exposes it over the admin HTTP listener (see [`crate::server`]).

use std::fmt;

use seekrelay_core::{Command, Role};
use serde::Serialize;
use tracing::info;

use crate::websocket::dispatcher::{BroadcastReport, Dispatcher};

/// Seek target used when the operator gives none (start of the media).
pub const DEFAULT_SEEK_SPEC: &str = "0";

/// Registered session counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    /// Registered seekers.
    pub seeker_count: usize,
    /// Registered switchers.
    pub switcher_count: usize,
    /// Both roles together.
    pub total: usize,
}

impl RelayStatus {
    /// Build from per-role counts.
    pub const fn new(seeker_count: usize, switcher_count: usize) -> Self {
        Self {
            seeker_count,
            switcher_count,
            total: seeker_count + switcher_count,
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Connected clients:\n- Seekers: {}\n- Switchers: {}\n- Total: {}",
            self.seeker_count, self.switcher_count, self.total
        )
    }
}

/// Result of one operator command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReport {
    /// The frame that was broadcast.
    pub command: String,
    /// Delivery outcome.
    #[serde(flatten)]
    pub broadcast: BroadcastReport,
}

impl fmt::Display for CommandReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = self.broadcast.role;
        if self.broadcast.no_recipients() {
            return write!(f, "No {role} clients connected.");
        }
        write!(
            f,
            "Sent {} to {} of {} {role} clients",
            self.command, self.broadcast.intended, self.broadcast.connected
        )?;
        if self.broadcast.failed > 0 {
            write!(
                f,
                "; removed {} disconnected, {} remaining",
                self.broadcast.failed, self.broadcast.remaining
            )?;
        }
        Ok(())
    }
}

/// The first whitespace-separated argument, or [`DEFAULT_SEEK_SPEC`].
pub fn seek_spec(args: Option<&str>) -> &str {
    args.and_then(|a| a.split_whitespace().next())
        .unwrap_or(DEFAULT_SEEK_SPEC)
}

/// Maps operator requests onto dispatcher broadcasts.
#[derive(Clone)]
pub struct RelayControl {
    dispatcher: Dispatcher,
}

impl RelayControl {
    /// Wrap a dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Send `/seek <spec>` to a random majority of the seekers.
    ///
    /// The spec is not validated here; clients resolve it.
    pub async fn request_seek(&self, args: Option<&str>) -> CommandReport {
        let command = Command::Seek(seek_spec(args).to_string()).to_frame();
        info!(command, "seek requested");
        let broadcast = self.dispatcher.broadcast_random_subset(&command).await;
        CommandReport { command, broadcast }
    }

    /// Send `/switch` to every switcher.
    pub async fn request_switch(&self) -> CommandReport {
        let switch = Command::Switch;
        let command = switch.to_frame();
        info!(command, "switch requested");
        let broadcast = self.dispatcher.broadcast_all(switch.target(), &command).await;
        CommandReport { command, broadcast }
    }

    /// Current per-role counts.
    pub fn query_status(&self) -> RelayStatus {
        self.dispatcher.registry().status()
    }
}
