//! One admitted connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use seekrelay_core::{Role, SessionId};
use tokio::sync::mpsc;

use crate::errors::TransportError;

/// An authenticated connection registered under a role.
///
/// Outbound frames go through a bounded channel to the connection's writer
/// task. When the writer stops, the channel closes and every later
/// [`Session::send`] fails.
pub struct Session {
    /// Unique session ID.
    pub id: SessionId,
    /// Role declared at admission. Never changes.
    pub role: Role,
    /// Best-effort originating address.
    pub identity: String,
    /// When admission completed.
    pub connected_at: Instant,
    messages_received: AtomicU64,
    tx: mpsc::Sender<Arc<str>>,
    last_pong: Mutex<Instant>,
}

impl Session {
    /// Create a session with a fresh ID.
    pub fn new(role: Role, identity: impl Into<String>, tx: mpsc::Sender<Arc<str>>) -> Self {
        let now = Instant::now();
        Self {
            id: SessionId::new(),
            role,
            identity: identity.into(),
            connected_at: now,
            messages_received: AtomicU64::new(0),
            tx,
            last_pong: Mutex::new(now),
        }
    }

    /// Queue a text frame for the writer.
    ///
    /// Waits while the queue is full. There is no send timeout; a peer that
    /// stops reading is only detected through the heartbeat.
    pub async fn send(&self, frame: Arc<str>) -> Result<(), TransportError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed(self.id.clone()))
    }

    /// Whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Count one inbound application message. Returns the new total.
    pub fn record_message(&self) -> u64 {
        self.messages_received.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Inbound application messages since admission.
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Record liveness (pong or any inbound frame).
    pub fn mark_alive(&self) {
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last sign of life.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Time since admission.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("identity", &self.identity)
            .field("messages_received", &self.messages_received())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn make_session(role: Role) -> (Session, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(8);
        (Session::new(role, "10.0.0.1", tx), rx)
    }

    #[tokio::test]
    async fn send_reaches_writer() {
        let (session, mut rx) = make_session(Role::Seeker);
        session.send(Arc::from("/seek 10")).await.unwrap();
        assert_eq!(&*rx.recv().await.unwrap(), "/seek 10");
    }

    #[tokio::test]
    async fn send_after_writer_gone_fails() {
        let (session, rx) = make_session(Role::Switcher);
        drop(rx);
        assert!(session.is_closed());
        assert_matches!(
            session.send(Arc::from("/switch")).await,
            Err(TransportError::Closed(id)) if id == session.id
        );
    }

    #[test]
    fn message_counter_increments() {
        let (session, _rx) = make_session(Role::Seeker);
        assert_eq!(session.messages_received(), 0);
        assert_eq!(session.record_message(), 1);
        assert_eq!(session.record_message(), 2);
        assert_eq!(session.messages_received(), 2);
    }

    #[test]
    fn mark_alive_resets_elapsed() {
        let (session, _rx) = make_session(Role::Seeker);
        std::thread::sleep(Duration::from_millis(20));
        assert!(session.last_pong_elapsed() >= Duration::from_millis(20));
        session.mark_alive();
        assert!(session.last_pong_elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn ids_are_unique() {
        let (a, _ra) = make_session(Role::Seeker);
        let (b, _rb) = make_session(Role::Seeker);
        assert_ne!(a.id, b.id);
    }
}
