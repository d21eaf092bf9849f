//! Relay settings errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why the relay settings could not be produced.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not JSON, or does not fit the settings shape.
    #[error("{} is not valid relay settings: {source}", path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A field holds a value the hub or client cannot run with.
    #[error("{key}: {reason}")]
    Invalid {
        /// camelCase path of the field, e.g. `hub.adminPort`.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_file() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("/etc/seekrelay.json"),
            source,
        };
        assert!(err.to_string().starts_with("/etc/seekrelay.json is not valid relay settings"));
    }

    #[test]
    fn invalid_names_field() {
        let err = SettingsError::invalid("client.vlcPort", "must be non-zero");
        assert_eq!(err.to_string(), "client.vlcPort: must be non-zero");
    }
}
