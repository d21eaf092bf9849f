//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use seekrelay_core::Role;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::RelaySettings;

/// Resolve the path to the settings file (`~/.seekrelay/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".seekrelay").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<RelaySettings> {
    let parse_error = |source: serde_json::Error| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(RelaySettings::default()).map_err(parse_error)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(parse_error)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(parse_error)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut RelaySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// | Variable | Field |
/// |----------|-------|
/// | `AUTH_TOKEN` | `hub.authToken` and `client.authToken` |
/// | `HOST` | `hub.host` |
/// | `PORT` | `hub.port` |
/// | `ADMIN_PORT` | `hub.adminPort` |
/// | `TELEGRAM_TOKEN` | `telegram.botToken` |
/// | `AUTHORIZED_CHAT_ID` | `telegram.authorizedChatId` |
/// | `SEEKRELAY_CONTROL_TOKEN` | `hub.controlToken` |
/// | `SEEKRELAY_SERVER_URL` | `client.serverUrl` |
/// | `SEEKRELAY_ROLE` | `client.role` |
/// | `SEEKRELAY_LOG_LEVEL` | `logging.level` |
///
/// Empty values are ignored. Values that fail to parse are ignored with a
/// warning.
pub fn apply_overrides<F>(settings: &mut RelaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("AUTH_TOKEN") {
        settings.client.auth_token.clone_from(&v);
        settings.hub.auth_token = v;
    }
    if let Some(v) = env.string("HOST") {
        settings.hub.host = v;
    }
    if let Some(v) = env.u16("PORT", 1, 65535) {
        settings.hub.port = v;
    }
    if let Some(v) = env.u16("ADMIN_PORT", 1, 65535) {
        settings.hub.admin_port = v;
    }
    if let Some(v) = env.string("SEEKRELAY_CONTROL_TOKEN") {
        settings.hub.control_token = Some(v);
    }

    if let Some(v) = env.string("TELEGRAM_TOKEN") {
        settings.telegram.bot_token = Some(v);
    }
    if let Some(v) = env.parsed("AUTHORIZED_CHAT_ID", parse_chat_id) {
        settings.telegram.authorized_chat_id = Some(v);
    }

    if let Some(v) = env.string("SEEKRELAY_SERVER_URL") {
        settings.client.server_url = v;
    }
    if let Some(v) = env.parsed("SEEKRELAY_ROLE", |s| s.parse::<Role>().ok()) {
        settings.client.role = v;
    }

    if let Some(v) = env.string("SEEKRELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a Telegram chat ID (negative for groups).
pub fn parse_chat_id(val: &str) -> Option<i64> {
    val.trim().parse().ok()
}

// ── Env readers ─────────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.parsed(name, |v| parse_u16_range(v, min, max))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
