//! # seekrelay-hub
//!
//! Relay hub binary: loads settings, starts the `WebSocket` and admin
//! listeners, and drains them on Ctrl-C/SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use seekrelay_core::logging::init_subscriber;
use seekrelay_server::RelayServer;
use seekrelay_server::metrics::install_recorder;
use seekrelay_server::notify::notifier_from_settings;
use seekrelay_server::shutdown::shutdown_signal;
use seekrelay_settings::{HubSettings, load_settings, load_settings_from_path};
use tracing::{info, warn};

/// Seekrelay hub.
#[derive(Parser, Debug)]
#[command(name = "seekrelay-hub", about = "Seekrelay relay hub")]
struct Cli {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// `WebSocket` port (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Admin HTTP port (0 for auto-assign).
    #[arg(long)]
    admin_port: Option<u16>,

    /// Settings file (defaults to `~/.seekrelay/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, hub: &mut HubSettings) {
        if let Some(host) = &self.host {
            hub.host.clone_from(host);
        }
        if let Some(port) = self.port {
            hub.port = port;
        }
        if let Some(port) = self.admin_port {
            hub.admin_port = port;
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
    cli.apply(&mut settings.hub);
    settings.hub.validate().context("invalid hub settings")?;

    init_subscriber(&settings.logging.level, settings.logging.format);

    if settings.hub.uses_default_token() {
        warn!("hub is using the default auth token; set AUTH_TOKEN or hub.authToken");
    }
    if settings.hub.control_token.is_none() {
        warn!("admin command routes are unauthenticated; set SEEKRELAY_CONTROL_TOKEN to restrict them");
    }

    let notifier = notifier_from_settings(&settings.telegram);
    let shutdown_timeout = Duration::from_secs(settings.hub.shutdown_timeout_secs);

    let mut server = RelayServer::new(settings.hub, notifier);
    match install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => warn!(error = %e, "metrics disabled"),
    }

    let running = server.start().await.context("failed to start hub")?;
    info!(
        ws = %running.ws_addr,
        admin = %running.admin_addr,
        "hub ready"
    );

    shutdown_signal().await;
    info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(running.into_tasks(), shutdown_timeout)
        .await;
    info!("hub stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "seekrelay-hub",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--admin-port",
            "9001",
        ]);
        let mut hub = HubSettings::default();
        cli.apply(&mut hub);
        assert_eq!(hub.host, "127.0.0.1");
        assert_eq!(hub.port, 9000);
        assert_eq!(hub.admin_port, 9001);
    }

    #[test]
    fn no_flags_keep_defaults() {
        let cli = Cli::parse_from(["seekrelay-hub"]);
        let mut hub = HubSettings::default();
        cli.apply(&mut hub);
        assert_eq!(hub.port, 8765);
        assert_eq!(hub.admin_port, 8080);
    }
}
