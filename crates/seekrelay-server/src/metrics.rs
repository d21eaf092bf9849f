//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::ServerError;

/// Install the global Prometheus recorder.
///
/// Returns the handle that renders `GET /metrics`. Call once, before any
/// metric is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Upgraded `WebSocket` connections (counter).
pub const CONNECTIONS_TOTAL: &str = "relay_connections_total";
/// Rejected admissions (counter, labels: reason).
pub const AUTH_FAILURES_TOTAL: &str = "relay_auth_failures_total";
/// Registered sessions (gauge, labels: role).
pub const SESSIONS_ACTIVE: &str = "relay_sessions_active";
/// Broadcast calls (counter, labels: mode).
pub const BROADCASTS_TOTAL: &str = "relay_broadcasts_total";
/// Failed sends during broadcasts (counter).
pub const BROADCAST_FAILURES_TOTAL: &str = "relay_broadcast_failures_total";
/// Inbound application frames after admission (counter).
pub const MESSAGES_RECEIVED_TOTAL: &str = "relay_messages_received_total";
/// Session lifetime (histogram).
pub const SESSION_DURATION_SECONDS: &str = "relay_session_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_recorder_renders() {
        // No global install, to keep tests independent.
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(CONNECTIONS_TOTAL).increment(2);
        });
        assert!(handle.render().contains("relay_connections_total 2"));
    }

    #[test]
    fn metric_names_are_prefixed_snake_case() {
        let names = [
            CONNECTIONS_TOTAL,
            AUTH_FAILURES_TOTAL,
            SESSIONS_ACTIVE,
            BROADCASTS_TOTAL,
            BROADCAST_FAILURES_TOTAL,
            MESSAGES_RECEIVED_TOTAL,
            SESSION_DURATION_SECONDS,
        ];
        for name in names {
            assert!(name.starts_with("relay_"));
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
