//! Per-role session bookkeeping.

use std::sync::Arc;

use metrics::gauge;
use parking_lot::RwLock;
use seekrelay_core::{Role, SessionId};

use super::session::Session;
use crate::control::RelayStatus;
use crate::metrics::SESSIONS_ACTIVE;

/// The live sessions, bucketed by role in insertion order.
///
/// Readers take a point-in-time [`snapshot`](Self::snapshot) and iterate it
/// without holding the lock, so removals never disturb an in-progress
/// broadcast.
#[derive(Default)]
pub struct SessionRegistry {
    seekers: RwLock<Vec<Arc<Session>>>,
    switchers: RwLock<Vec<Arc<Session>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, role: Role) -> &RwLock<Vec<Arc<Session>>> {
        match role {
            Role::Seeker => &self.seekers,
            Role::Switcher => &self.switchers,
        }
    }

    /// Append a session to its role's bucket. Returns the bucket size.
    ///
    /// Never rejects. Session IDs are fresh per connection, so a bucket
    /// holds no duplicates without checking.
    pub fn add(&self, session: Arc<Session>) -> usize {
        let role = session.role;
        let count = {
            let mut bucket = self.bucket(role).write();
            bucket.push(session);
            bucket.len()
        };
        record_gauge(role, count);
        count
    }

    /// Remove a session by ID. Absent sessions are a no-op.
    ///
    /// Returns whether this call removed it.
    pub fn remove(&self, role: Role, id: &SessionId) -> bool {
        let (removed, count) = {
            let mut bucket = self.bucket(role).write();
            let idx = bucket.iter().position(|s| &s.id == id);
            let removed = idx.map(|i| bucket.remove(i)).is_some();
            (removed, bucket.len())
        };
        if removed {
            record_gauge(role, count);
        }
        removed
    }

    /// Remove several sessions under one lock.
    ///
    /// Returns `(removed, remaining)`.
    pub fn remove_many(&self, role: Role, ids: &[SessionId]) -> (usize, usize) {
        let (removed, count) = {
            let mut bucket = self.bucket(role).write();
            let before = bucket.len();
            bucket.retain(|s| !ids.contains(&s.id));
            (before - bucket.len(), bucket.len())
        };
        if removed > 0 {
            record_gauge(role, count);
        }
        (removed, count)
    }

    /// Current bucket size.
    pub fn count_of(&self, role: Role) -> usize {
        self.bucket(role).read().len()
    }

    /// Point-in-time copy of a bucket.
    pub fn snapshot(&self, role: Role) -> Vec<Arc<Session>> {
        self.bucket(role).read().clone()
    }

    /// Whether a session is registered.
    pub fn contains(&self, role: Role, id: &SessionId) -> bool {
        self.bucket(role).read().iter().any(|s| &s.id == id)
    }

    /// Counts for both roles.
    pub fn status(&self) -> RelayStatus {
        RelayStatus::new(self.count_of(Role::Seeker), self.count_of(Role::Switcher))
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_gauge(role: Role, count: usize) {
    gauge!(SESSIONS_ACTIVE, "role" => role.as_str()).set(count as f64);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
