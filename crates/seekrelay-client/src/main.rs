//! # seekrelay-client
//!
//! Media client binary: registers with the hub as a seeker or switcher and
//! acts on the commands it relays. Seekers launch and own a VLC player.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use seekrelay_client::player::scatter_start;
use seekrelay_client::{ClientSession, MediaControl, PlayerProcess, VlcRemote};
use seekrelay_core::Role;
use seekrelay_core::logging::init_subscriber;
use seekrelay_settings::{ClientSettings, load_settings, load_settings_from_path};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Seekrelay media client.
#[derive(Parser, Debug)]
#[command(name = "seekrelay-client", about = "Seekrelay media client")]
struct Cli {
    /// Client role (seeker or switcher).
    #[arg(long = "type")]
    role: Option<Role>,

    /// Authentication token.
    #[arg(long)]
    token: Option<String>,

    /// Hub WebSocket URL.
    #[arg(long)]
    server: Option<String>,

    /// Host the player's rc interface listens on.
    #[arg(long)]
    vlc_host: Option<String>,

    /// Port of the player's rc interface.
    #[arg(long)]
    vlc_port: Option<u16>,

    /// Media file to play.
    #[arg(long)]
    video: Option<String>,

    /// Settings file (defaults to `~/.seekrelay/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Do not launch a player; drive one that is already running.
    #[arg(long)]
    no_player: bool,
}

impl Cli {
    fn apply(&self, client: &mut ClientSettings) {
        if let Some(role) = self.role {
            client.role = role;
        }
        if let Some(token) = &self.token {
            client.auth_token.clone_from(token);
        }
        if let Some(server) = &self.server {
            client.server_url.clone_from(server);
        }
        if let Some(host) = &self.vlc_host {
            client.vlc_advertise_host.clone_from(host);
        }
        if let Some(port) = self.vlc_port {
            client.vlc_port = port;
        }
        if let Some(video) = &self.video {
            client.video_path.clone_from(video);
        }
        if self.no_player {
            client.launch_player = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("failed to load settings")?;
    cli.apply(&mut settings.client);
    settings.client.validate().context("invalid client settings")?;

    init_subscriber(&settings.logging.level, settings.logging.format);
    let client = settings.client;
    info!(role = %client.role, server = %client.server_url, "starting client");

    let mut player = None;
    let cancel = CancellationToken::new();
    let outcome = tokio::select! {
        r = serve(&client, &mut player, cancel.clone()) => r,
        () = wait_for_signal() => {
            info!("signal received, shutting down");
            cancel.cancel();
            Ok(())
        }
    };

    if let Some(player) = player {
        player.terminate().await;
    }
    outcome
}

/// Launch the player if this is a seeker, then run the hub session.
///
/// The player is handed out through `player` as soon as it exists so the
/// caller can tear it down even when this future is dropped mid-startup.
async fn serve(
    client: &ClientSettings,
    player: &mut Option<PlayerProcess>,
    cancel: CancellationToken,
) -> Result<()> {
    let media: Arc<dyn MediaControl> = Arc::new(VlcRemote::new(client.vlc_connect_addr()));

    if client.role == Role::Seeker && client.launch_player {
        *player = Some(PlayerProcess::spawn(client).context("failed to launch player")?);
        tokio::time::sleep(Duration::from_secs(client.player_startup_secs)).await;
        let _ = scatter_start(media.as_ref(), client.start_scatter_percent).await;
    }

    ClientSession::new(client, media).run(cancel).await;
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    r = tokio::signal::ctrl_c() => {
                        if let Err(e) = r {
                            warn!(error = %e, "failed to listen for ctrl-c");
                        }
                    }
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to listen for SIGTERM"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "seekrelay-client",
            "--type",
            "switcher",
            "--token",
            "abc",
            "--server",
            "ws://hub:9000",
            "--vlc-host",
            "0.0.0.0",
            "--vlc-port",
            "5000",
            "--video",
            "/media/a.mp4",
            "--no-player",
        ]);
        let mut client = ClientSettings::default();
        cli.apply(&mut client);
        assert_eq!(client.role, Role::Switcher);
        assert_eq!(client.auth_token, "abc");
        assert_eq!(client.server_url, "ws://hub:9000");
        assert_eq!(client.vlc_advertise_host, "0.0.0.0");
        assert_eq!(client.vlc_connect_host, "localhost");
        assert_eq!(client.vlc_port, 5000);
        assert_eq!(client.video_path, "/media/a.mp4");
        assert!(!client.launch_player);
    }

    #[test]
    fn no_flags_keep_settings() {
        let cli = Cli::parse_from(["seekrelay-client"]);
        let mut client = ClientSettings::default();
        cli.apply(&mut client);
        assert_eq!(client.role, Role::Seeker);
        assert!(client.launch_player);
    }

    #[test]
    fn role_flag_is_case_insensitive() {
        let cli = Cli::parse_from(["seekrelay-client", "--type", "Seeker"]);
        assert_eq!(cli.role, Some(Role::Seeker));
        assert!(Cli::try_parse_from(["seekrelay-client", "--type", "watcher"]).is_err());
    }
}
