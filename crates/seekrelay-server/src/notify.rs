//! Operator notifications.
//!
//! The hub reports admissions, disconnects and broadcast cleanups to a
//! [`Notifier`]. Delivery is best-effort: failures are logged and never
//! reach the caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use seekrelay_core::Role;
use seekrelay_settings::TelegramSettings;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::NotifyError;

const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

/// A registry change worth telling the operator about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEvent {
    /// A session passed admission.
    Admitted {
        /// Declared role.
        role: Role,
        /// Originating address.
        identity: String,
        /// Sessions of that role after the add.
        count: usize,
    },
    /// A session's receive loop ended while it was still registered.
    Disconnected {
        /// Session role.
        role: Role,
        /// Originating address.
        identity: String,
        /// Sessions of that role after the removal.
        count: usize,
    },
    /// A broadcast removed sessions whose send failed.
    Pruned {
        /// Role that was broadcast to.
        role: Role,
        /// Sessions whose send failed.
        removed: usize,
        /// Sessions of that role after cleanup.
        remaining: usize,
    },
}

impl fmt::Display for RelayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admitted {
                role,
                identity,
                count,
            } => write!(
                f,
                "🟢 {} client connected from {identity}. Total {role} clients: {count}",
                role.title()
            ),
            Self::Disconnected {
                role,
                identity,
                count,
            } => write!(
                f,
                "🔴 {} client from {identity} disconnected. Total {role} clients: {count}",
                role.title()
            ),
            Self::Pruned {
                role,
                removed,
                remaining,
            } => write!(
                f,
                "⚠️ Removed {removed} disconnected {role} clients. Total {role} clients: {remaining}"
            ),
        }
    }
}

/// Receives [`RelayEvent`]s.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event. Must not fail the caller.
    async fn notify(&self, event: &RelayEvent);
}

/// Writes events to the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &RelayEvent) {
        info!(%event, "relay event");
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Posts events to one Telegram chat through the Bot API.
#[derive(Clone, Debug)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: i64,
}

impl TelegramNotifier {
    /// Build a notifier for `chat_id` using bot `token`.
    pub fn new(api_base: &str, token: &str, chat_id: i64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(TELEGRAM_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{token}/sendMessage", api_base.trim_end_matches('/')),
            chat_id,
        })
    }

    /// Send one text message.
    pub async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &RelayEvent) {
        let text = event.to_string();
        info!(event = %text, "relay event");
        match self.send_text(&text).await {
            Ok(()) => debug!(chat_id = self.chat_id, "notification delivered"),
            Err(e) => warn!(chat_id = self.chat_id, error = %e, "failed to send notification"),
        }
    }
}

/// Pick the notifier for the configured Telegram settings.
///
/// Falls back to [`LogNotifier`] when credentials are incomplete or the
/// HTTP client cannot be built.
pub fn notifier_from_settings(settings: &TelegramSettings) -> Arc<dyn Notifier> {
    let Some((token, chat_id)) = settings.credentials() else {
        info!("telegram notifications disabled");
        return Arc::new(LogNotifier);
    };
    match TelegramNotifier::new(&settings.api_base, token, chat_id) {
        Ok(notifier) => {
            info!(chat_id, "telegram notifications enabled");
            Arc::new(notifier)
        }
        Err(e) => {
            warn!(error = %e, "telegram notifier unavailable, logging events only");
            Arc::new(LogNotifier)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
