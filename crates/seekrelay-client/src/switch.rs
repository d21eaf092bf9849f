//! Local action a switcher performs on `/switch`.

use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::AdapterError;

/// Optional external program run on every `/switch`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwitchAction {
    program: Option<String>,
    args: Vec<String>,
}

impl SwitchAction {
    /// Build from `[program, args...]`. An empty list means log only.
    pub fn from_command(command: &[String]) -> Self {
        match command.split_first() {
            Some((program, args)) if !program.is_empty() => Self {
                program: Some(program.clone()),
                args: args.to_vec(),
            },
            _ => Self::default(),
        }
    }

    /// Launch the program without waiting for it.
    ///
    /// The child is reaped on a background task that logs its exit status.
    /// The returned handle resolves to that status and may be dropped.
    /// `None` when nothing is configured.
    pub fn start(&self) -> Result<Option<JoinHandle<Option<ExitStatus>>>, AdapterError> {
        let Some(program) = &self.program else {
            info!("switch command received, no action configured");
            return Ok(None);
        };
        info!(program, args = ?self.args, "starting switch action");
        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| AdapterError::Spawn {
                program: program.clone(),
                source,
            })?;

        let program = program.clone();
        let reaper = tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!(program, %status, "switch action finished");
                    Some(status)
                }
                Ok(status) => {
                    warn!(program, %status, "switch action failed");
                    Some(status)
                }
                Err(e) => {
                    warn!(program, error = %e, "failed to wait for switch action");
                    None
                }
            }
        });
        Ok(Some(reaper))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
