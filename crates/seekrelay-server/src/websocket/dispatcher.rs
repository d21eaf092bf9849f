//! Command fan-out to registered sessions.
//!
//! Each broadcast works on a snapshot of the target bucket. Sends run
//! concurrently; a failed send never stops delivery to the others. Once all
//! sends settle, failed sessions are removed from the registry in one pass
//! and a single [`RelayEvent::Pruned`] is emitted if anything failed.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use rand::Rng;
use rand::seq::IndexedRandom;
use seekrelay_core::{Role, SessionId};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::registry::SessionRegistry;
use super::session::Session;
use crate::metrics::{BROADCAST_FAILURES_TOTAL, BROADCASTS_TOTAL};
use crate::notify::{Notifier, RelayEvent};

/// How recipients were chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BroadcastMode {
    /// Every session of the role.
    All,
    /// A random strict majority of the seekers.
    Majority,
}

impl BroadcastMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Majority => "majority",
        }
    }
}

/// Outcome of one broadcast call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReport {
    /// Role broadcast to.
    pub role: Role,
    /// Recipient selection.
    pub mode: BroadcastMode,
    /// Sessions of the role when the broadcast started.
    pub connected: usize,
    /// Sessions selected as recipients.
    pub intended: usize,
    /// Recipients whose send failed.
    pub failed: usize,
    /// Sessions of the role after cleanup.
    pub remaining: usize,
}

impl BroadcastReport {
    /// Whether nobody was selected.
    pub fn no_recipients(&self) -> bool {
        self.intended == 0
    }

    /// Recipients that accepted the frame.
    pub fn delivered(&self) -> usize {
        self.intended - self.failed
    }
}

/// Size of the seeker subset for a majority broadcast over `n` sessions.
pub fn majority_size(n: usize) -> usize {
    if n == 0 { 0 } else { n / 2 + 1 }
}

/// Pick a strict majority of `sessions` uniformly at random, without
/// replacement.
pub fn select_majority<R: Rng + ?Sized>(
    sessions: &[Arc<Session>],
    rng: &mut R,
) -> Vec<Arc<Session>> {
    let k = majority_size(sessions.len());
    sessions.choose_multiple(rng, k).cloned().collect()
}

/// Sends command frames to sessions held in a [`SessionRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`, reporting cleanups to `notifier`.
    pub fn new(registry: Arc<SessionRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self { registry, notifier }
    }

    /// The registry this dispatcher reads.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Send `message` to every session of `role`.
    pub async fn broadcast_all(&self, role: Role, message: &str) -> BroadcastReport {
        let recipients = self.registry.snapshot(role);
        let connected = recipients.len();
        self.deliver(role, BroadcastMode::All, connected, recipients, message)
            .await
    }

    /// Send `message` to a random strict majority of the seekers.
    ///
    /// Sessions outside the chosen subset are not touched, so their failures
    /// go unnoticed by this call.
    pub async fn broadcast_random_subset(&self, message: &str) -> BroadcastReport {
        let snapshot = self.registry.snapshot(Role::Seeker);
        let connected = snapshot.len();
        let recipients = select_majority(&snapshot, &mut rand::rng());
        self.deliver(
            Role::Seeker,
            BroadcastMode::Majority,
            connected,
            recipients,
            message,
        )
        .await
    }

    async fn deliver(
        &self,
        role: Role,
        mode: BroadcastMode,
        connected: usize,
        recipients: Vec<Arc<Session>>,
        message: &str,
    ) -> BroadcastReport {
        counter!(BROADCASTS_TOTAL, "mode" => mode.as_str()).increment(1);
        let intended = recipients.len();
        if recipients.is_empty() {
            info!(%role, mode = mode.as_str(), "no recipients connected");
            return BroadcastReport {
                role,
                mode,
                connected,
                intended,
                failed: 0,
                remaining: self.registry.count_of(role),
            };
        }

        info!(%role, mode = mode.as_str(), recipients = intended, connected, "broadcasting");
        let frame: Arc<str> = Arc::from(message);
        let results = join_all(recipients.iter().map(|s| s.send(frame.clone()))).await;

        let failed: Vec<SessionId> = recipients
            .iter()
            .zip(results)
            .filter_map(|(session, result)| {
                result.err().map(|e| {
                    debug!(session_id = %session.id, identity = %session.identity, error = %e, "send failed");
                    session.id.clone()
                })
            })
            .collect();

        let remaining = if failed.is_empty() {
            self.registry.count_of(role)
        } else {
            let (removed, remaining) = self.registry.remove_many(role, &failed);
            counter!(BROADCAST_FAILURES_TOTAL).increment(failed.len() as u64);
            warn!(
                %role,
                failed = failed.len(),
                removed,
                remaining,
                "removed disconnected sessions after broadcast"
            );
            self.notifier
                .notify(&RelayEvent::Pruned {
                    role,
                    removed: failed.len(),
                    remaining,
                })
                .await;
            remaining
        };

        BroadcastReport {
            role,
            mode,
            connected,
            intended,
            failed: failed.len(),
            remaining,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{LogNotifier, MockNotifier};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tokio::sync::mpsc;

    struct Peer {
        session: Arc<Session>,
        rx: Option<mpsc::Receiver<Arc<str>>>,
    }

    impl Peer {
        fn received(&mut self) -> Option<String> {
            self.rx.as_mut()?.try_recv().ok().map(|f| f.to_string())
        }
    }

    fn register(reg: &SessionRegistry, role: Role, n: usize) -> Vec<Peer> {
        (0..n)
            .map(|i| {
                let (tx, rx) = mpsc::channel(4);
                let session = Arc::new(Session::new(role, format!("10.0.0.{i}"), tx));
                let _ = reg.add(session.clone());
                Peer {
                    session,
                    rx: Some(rx),
                }
            })
            .collect()
    }

    fn kill(peer: &mut Peer) {
        peer.rx = None;
    }

    fn quiet_dispatcher(reg: &Arc<SessionRegistry>) -> Dispatcher {
        Dispatcher::new(reg.clone(), Arc::new(LogNotifier))
    }

    #[test]
    fn majority_sizes() {
        assert_eq!(majority_size(0), 0);
        assert_eq!(majority_size(1), 1);
        assert_eq!(majority_size(2), 2);
        assert_eq!(majority_size(3), 2);
        assert_eq!(majority_size(4), 3);
        assert_eq!(majority_size(5), 3);
        assert_eq!(majority_size(10), 6);
    }

    #[test]
    fn select_majority_picks_distinct_sessions() {
        let reg = SessionRegistry::new();
        let _peers = register(&reg, Role::Seeker, 9);
        let snapshot = reg.snapshot(Role::Seeker);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let picked = select_majority(&snapshot, &mut rng);
            let ids: HashSet<_> = picked.iter().map(|s| s.id.clone()).collect();
            assert_eq!(picked.len(), 5);
            assert_eq!(ids.len(), 5);
        }
    }

    #[test]
    fn select_majority_of_nothing_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_majority(&[], &mut rng).is_empty());
    }

    #[tokio::test]
    async fn broadcast_all_reaches_every_session_of_role() {
        let reg = Arc::new(SessionRegistry::new());
        let mut switchers = register(&reg, Role::Switcher, 3);
        let mut seekers = register(&reg, Role::Seeker, 2);
        let report = quiet_dispatcher(&reg)
            .broadcast_all(Role::Switcher, "/switch")
            .await;

        assert_eq!(report.intended, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.remaining, 3);
        for peer in &mut switchers {
            assert_eq!(peer.received().as_deref(), Some("/switch"));
        }
        for peer in &mut seekers {
            assert_eq!(peer.received(), None);
        }
    }

    #[tokio::test]
    async fn broadcast_all_removes_failed_and_notifies_once() {
        let reg = Arc::new(SessionRegistry::new());
        let mut peers = register(&reg, Role::Seeker, 4);
        kill(&mut peers[1]);
        kill(&mut peers[3]);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|event| {
                *event
                    == RelayEvent::Pruned {
                        role: Role::Seeker,
                        removed: 2,
                        remaining: 2,
                    }
            })
            .times(1)
            .returning(|_| ());
        let dispatcher = Dispatcher::new(reg.clone(), Arc::new(notifier));

        let report = dispatcher.broadcast_all(Role::Seeker, "/seek 10").await;
        assert_eq!(report.intended, 4);
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.remaining, 2);

        assert!(reg.contains(Role::Seeker, &peers[0].session.id));
        assert!(!reg.contains(Role::Seeker, &peers[1].session.id));
        assert!(reg.contains(Role::Seeker, &peers[2].session.id));
        assert!(!reg.contains(Role::Seeker, &peers[3].session.id));
        assert_eq!(peers[0].received().as_deref(), Some("/seek 10"));
        assert_eq!(peers[2].received().as_deref(), Some("/seek 10"));
    }

    #[tokio::test]
    async fn no_failures_means_no_notification() {
        let reg = Arc::new(SessionRegistry::new());
        let _peers = register(&reg, Role::Switcher, 2);
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(0);
        let dispatcher = Dispatcher::new(reg, Arc::new(notifier));
        let report = dispatcher.broadcast_all(Role::Switcher, "/switch").await;
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn empty_role_reports_no_recipients() {
        let reg = Arc::new(SessionRegistry::new());
        let dispatcher = quiet_dispatcher(&reg);
        let report = dispatcher.broadcast_all(Role::Switcher, "/switch").await;
        assert!(report.no_recipients());
        let report = dispatcher.broadcast_random_subset("/seek 0").await;
        assert!(report.no_recipients());
        assert_eq!(report.connected, 0);
        assert_eq!(report.mode, BroadcastMode::Majority);
    }

    #[tokio::test]
    async fn random_subset_sends_to_majority_only() {
        let reg = Arc::new(SessionRegistry::new());
        let mut peers = register(&reg, Role::Seeker, 5);
        let _switchers = register(&reg, Role::Switcher, 2);

        let report = quiet_dispatcher(&reg).broadcast_random_subset("/seek 50%").await;
        assert_eq!(report.connected, 5);
        assert_eq!(report.intended, 3);
        assert_eq!(report.role, Role::Seeker);

        let got = peers.iter_mut().filter_map(Peer::received).count();
        assert_eq!(got, 3);
        assert_eq!(reg.count_of(Role::Seeker), 5);
    }

    #[tokio::test]
    async fn random_subset_single_seeker_always_selected() {
        let reg = Arc::new(SessionRegistry::new());
        let mut peers = register(&reg, Role::Seeker, 1);
        let report = quiet_dispatcher(&reg).broadcast_random_subset("/seek -1").await;
        assert_eq!(report.intended, 1);
        assert_eq!(peers[0].received().as_deref(), Some("/seek -1"));
    }

    #[tokio::test]
    async fn random_subset_cleans_up_only_selected_failures() {
        let reg = Arc::new(SessionRegistry::new());
        let mut peers = register(&reg, Role::Seeker, 2);
        // n = 2 selects both, so the dead one is always observed.
        kill(&mut peers[0]);
        let report = quiet_dispatcher(&reg).broadcast_random_subset("/seek 1").await;
        assert_eq!(report.intended, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.remaining, 1);
        assert!(!reg.contains(Role::Seeker, &peers[0].session.id));
        assert!(reg.contains(Role::Seeker, &peers[1].session.id));
    }

    #[tokio::test]
    async fn session_removed_mid_broadcast_is_tolerated() {
        let reg = Arc::new(SessionRegistry::new());
        let mut peers = register(&reg, Role::Switcher, 2);
        // The receive loop already cleaned this one up.
        let _ = reg.remove(Role::Switcher, &peers[0].session.id);
        kill(&mut peers[0]);

        let report = quiet_dispatcher(&reg).broadcast_all(Role::Switcher, "/switch").await;
        // The snapshot no longer contains it, so nothing failed.
        assert_eq!(report.intended, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.remaining, 1);
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = BroadcastReport {
            role: Role::Seeker,
            mode: BroadcastMode::Majority,
            connected: 5,
            intended: 3,
            failed: 1,
            remaining: 4,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["role"], "seeker");
        assert_eq!(json["mode"], "majority");
        assert_eq!(json["intended"], 3);
        assert_eq!(json["remaining"], 4);
    }
}
