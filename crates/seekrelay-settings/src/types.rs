//! Settings types with compiled defaults.

use std::time::Duration;

use seekrelay_core::Role;
use seekrelay_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Shared secret used when none is configured.
pub const DEFAULT_AUTH_TOKEN: &str = "secret_token_123";

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Relay hub settings.
    pub hub: HubSettings,
    /// Media client settings.
    pub client: ClientSettings,
    /// Operator notifications via a Telegram bot.
    pub telegram: TelegramSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Relay hub network and session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Bind address for both listeners.
    pub host: String,
    /// WebSocket listener port.
    pub port: u16,
    /// Admin listener port (health, status, commands, metrics).
    pub admin_port: u16,
    /// Shared secret clients must present in their first frame.
    pub auth_token: String,
    /// Bearer token required on the admin command routes, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_token: Option<String>,
    /// Seconds a new connection has to send its auth frame.
    pub handshake_timeout_secs: u64,
    /// Seconds between server-initiated pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds without a pong before a session is dropped.
    pub pong_timeout_secs: u64,
    /// Outbound frames buffered per session.
    pub send_queue_capacity: usize,
    /// Seconds to wait for tasks on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            admin_port: 8080,
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
            control_token: None,
            handshake_timeout_secs: 10,
            heartbeat_interval_secs: 30,
            pong_timeout_secs: 60,
            send_queue_capacity: 256,
            shutdown_timeout_secs: 10,
        }
    }
}

impl HubSettings {
    /// Whether the shared secret was left at its compiled default.
    pub fn uses_default_token(&self) -> bool {
        self.auth_token == DEFAULT_AUTH_TOKEN
    }

    /// Reject combinations the hub cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.is_empty() {
            return Err(SettingsError::invalid("hub.authToken", "must not be empty"));
        }
        if self.port != 0 && self.port == self.admin_port {
            return Err(SettingsError::invalid(
                "hub.adminPort",
                format!("must differ from hub.port (both {})", self.port),
            ));
        }
        if self.send_queue_capacity == 0 {
            return Err(SettingsError::invalid("hub.sendQueueCapacity", "must be at least 1"));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(SettingsError::invalid(
                "hub.heartbeatIntervalSecs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Media client settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Role this client registers as.
    pub role: Role,
    /// Shared secret sent in the auth frame.
    pub auth_token: String,
    /// Hub WebSocket URL.
    pub server_url: String,
    /// Host the player's rc interface listens on.
    pub vlc_advertise_host: String,
    /// Host used to reach the player's rc interface.
    pub vlc_connect_host: String,
    /// Port of the player's rc interface.
    pub vlc_port: u16,
    /// Media file the player loops.
    pub video_path: String,
    /// Player executable.
    pub player_binary: String,
    /// Whether a seeker launches its own player process.
    pub launch_player: bool,
    /// Seconds to wait after launching the player before talking to it.
    pub player_startup_secs: u64,
    /// Upper bound of the random start position, as a percentage of the duration.
    pub start_scatter_percent: u64,
    /// Flat delay between reconnect attempts, in seconds.
    pub reconnect_delay_secs: u64,
    /// Seconds allowed for the WebSocket connect.
    pub connect_timeout_secs: u64,
    /// Program and arguments run on `/switch` (switchers only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub switch_command: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            role: Role::Seeker,
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
            server_url: "ws://localhost:8765".to_string(),
            vlc_advertise_host: "localhost".to_string(),
            vlc_connect_host: "localhost".to_string(),
            vlc_port: 4212,
            video_path: "/path/to/video.mp4".to_string(),
            player_binary: "cvlc".to_string(),
            launch_player: true,
            player_startup_secs: 2,
            start_scatter_percent: 80,
            reconnect_delay_secs: 10,
            connect_timeout_secs: 10,
            switch_command: Vec::new(),
        }
    }
}

impl ClientSettings {
    /// Flat reconnect backoff.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `host:port` used to reach the player's rc interface.
    pub fn vlc_connect_addr(&self) -> String {
        format!("{}:{}", self.vlc_connect_host, self.vlc_port)
    }

    /// Reject combinations the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("ws://") || self.server_url.starts_with("wss://")) {
            return Err(SettingsError::invalid(
                "client.serverUrl",
                format!("must be a ws:// or wss:// URL, got '{}'", self.server_url),
            ));
        }
        if self.vlc_port == 0 {
            return Err(SettingsError::invalid("client.vlcPort", "must be non-zero"));
        }
        if self.start_scatter_percent > 100 {
            return Err(SettingsError::invalid(
                "client.startScatterPercent",
                "must be within 0..=100",
            ));
        }
        Ok(())
    }
}

/// Telegram bot used for operator notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramSettings {
    /// Bot API token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    /// Chat that receives notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_chat_id: Option<i64>,
    /// Bot API base URL.
    pub api_base: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            authorized_chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramSettings {
    /// Token and chat ID, when both are configured.
    pub fn credentials(&self) -> Option<(&str, i64)> {
        match (&self.bot_token, self.authorized_chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() => Some((token.as_str(), chat)),
            _ => None,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Level or filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_hub_is_valid() {
        HubSettings::default().validate().unwrap();
        assert!(HubSettings::default().uses_default_token());
    }

    #[test]
    fn hub_rejects_empty_token() {
        let hub = HubSettings {
            auth_token: String::new(),
            ..HubSettings::default()
        };
        assert_matches!(hub.validate(), Err(SettingsError::Invalid { .. }));
    }

    #[test]
    fn hub_rejects_port_collision() {
        let hub = HubSettings {
            port: 9000,
            admin_port: 9000,
            ..HubSettings::default()
        };
        assert_matches!(hub.validate(), Err(SettingsError::Invalid { .. }));
    }

    #[test]
    fn hub_allows_two_ephemeral_ports() {
        let hub = HubSettings {
            port: 0,
            admin_port: 0,
            ..HubSettings::default()
        };
        hub.validate().unwrap();
    }

    #[test]
    fn default_client_is_valid() {
        let client = ClientSettings::default();
        client.validate().unwrap();
        assert_eq!(client.vlc_connect_addr(), "localhost:4212");
        assert_eq!(client.reconnect_delay(), Duration::from_secs(10));
    }

    #[test]
    fn client_rejects_http_url() {
        let client = ClientSettings {
            server_url: "http://hub:8765".into(),
            ..ClientSettings::default()
        };
        assert_matches!(client.validate(), Err(SettingsError::Invalid { .. }));
    }

    #[test]
    fn telegram_credentials_need_both_parts() {
        let mut tg = TelegramSettings::default();
        assert!(tg.credentials().is_none());
        tg.bot_token = Some("123:abc".into());
        assert!(tg.credentials().is_none());
        tg.authorized_chat_id = Some(-42);
        assert_eq!(tg.credentials(), Some(("123:abc", -42)));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"hub": {"port": 9999}, "client": {"role": "switcher"}}"#;
        let settings: RelaySettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.hub.port, 9999);
        assert_eq!(settings.hub.admin_port, 8080);
        assert_eq!(settings.client.role, Role::Switcher);
        assert_eq!(settings.client.vlc_port, 4212);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(RelaySettings::default()).unwrap();
        assert_eq!(value["hub"]["adminPort"], 8080);
        assert_eq!(value["client"]["reconnectDelaySecs"], 10);
        assert!(value["hub"].get("controlToken").is_none());
    }
}
