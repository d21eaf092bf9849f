//! The media player a seeker launches and owns.

use std::process::Stdio;

use rand::Rng;
use seekrelay_settings::ClientSettings;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::adapter::MediaControl;
use crate::errors::AdapterError;

/// Command-line arguments for a looping, fullscreen player with the `rc`
/// interface on the advertised address.
pub fn player_args(settings: &ClientSettings) -> Vec<String> {
    vec![
        settings.video_path.clone(),
        "--intf".into(),
        "rc".into(),
        "--rc-host".into(),
        format!("{}:{}", settings.vlc_advertise_host, settings.vlc_port),
        "--loop".into(),
        "--no-video-title-show".into(),
        "--fullscreen".into(),
        "--metadata-network-access".into(),
    ]
}

/// A running player process.
///
/// Killed when dropped; [`PlayerProcess::terminate`] also reaps it.
#[derive(Debug)]
pub struct PlayerProcess {
    child: Child,
    program: String,
}

impl PlayerProcess {
    /// Launch the configured player binary on the configured media file.
    pub fn spawn(settings: &ClientSettings) -> Result<Self, AdapterError> {
        let program = settings.player_binary.clone();
        let args = player_args(settings);
        info!(program, video = %settings.video_path, "starting player");
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AdapterError::Spawn {
                program: program.clone(),
                source,
            })?;
        Ok(Self { child, program })
    }

    /// OS process id, while the process is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the player and wait for it to exit.
    pub async fn terminate(mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(program = %self.program, error = %e, "player already exited");
        }
        match self.child.wait().await {
            Ok(status) => info!(program = %self.program, %status, "player terminated"),
            Err(e) => warn!(program = %self.program, error = %e, "failed to reap player"),
        }
    }
}

/// Seek to a random point in the first `scatter_percent` of the media so
/// that freshly started players do not all show the same frame.
///
/// Returns the chosen offset, or `None` when the length is unknown.
pub async fn scatter_start<M>(media: &M, scatter_percent: u64) -> Option<u64>
where
    M: MediaControl + ?Sized,
{
    let duration = media.get_duration().await;
    if duration == 0 {
        debug!("media length unknown, starting at the beginning");
        return None;
    }
    let upper = duration.saturating_mul(scatter_percent) / 100;
    let position = rand::rng().random_range(0..=upper);
    info!(position, duration, "seeking to random start position");
    if let Err(e) = media.send_command(&format!("seek {position}")).await {
        warn!(error = %e, "start seek failed");
    }
    Some(position)
}
