//! # seekrelay-settings
//!
//! Configuration for the hub and the media clients, built once at startup.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: `~/.seekrelay/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: see [`loader::apply_overrides`]
//!
//! The binaries apply their CLI flags on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_values() {
        let settings = RelaySettings::default();
        assert_eq!(settings.hub.port, 8765);
        assert_eq!(settings.hub.admin_port, 8080);
        assert_eq!(settings.hub.auth_token, "secret_token_123");
        assert_eq!(settings.client.server_url, "ws://localhost:8765");
        assert_eq!(settings.client.vlc_port, 4212);
        assert_eq!(settings.client.reconnect_delay_secs, 10);
        assert!(settings.telegram.bot_token.is_none());
    }
}
