//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::control::RelayStatus;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the hub is running.
    pub status: &'static str,
    /// Seconds since the hub started.
    pub uptime_secs: u64,
    /// Registered seekers.
    pub seekers: usize,
    /// Registered switchers.
    pub switchers: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, status: &RelayStatus) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        seekers: status.seeker_count,
        switchers: status.switcher_count,
    }
}
