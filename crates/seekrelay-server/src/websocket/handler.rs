//! Connection lifecycle: admission, receive loop, teardown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, histogram};
use seekrelay_core::AuthFrame;
use seekrelay_core::protocol::{echo, welcome};
use seekrelay_settings::HubSettings;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info, instrument, warn};

use super::admission::{await_auth_frame, frame_text, reject};
use super::registry::SessionRegistry;
use super::session::Session;
use crate::metrics::{AUTH_FAILURES_TOTAL, MESSAGES_RECEIVED_TOTAL, SESSION_DURATION_SECONDS};
use crate::notify::{Notifier, RelayEvent};

/// Per-connection limits and the shared secret.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Secret the first frame must carry.
    pub auth_token: String,
    /// How long a new connection may stay silent before it is dropped.
    pub handshake_timeout: Duration,
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
    /// Silence after which a session is considered dead.
    pub pong_timeout: Duration,
    /// Outbound queue depth per session.
    pub send_queue_capacity: usize,
}

impl From<&HubSettings> for ConnectionConfig {
    fn from(s: &HubSettings) -> Self {
        Self {
            auth_token: s.auth_token.clone(),
            handshake_timeout: Duration::from_secs(s.handshake_timeout_secs),
            heartbeat_interval: Duration::from_secs(s.heartbeat_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(s.pong_timeout_secs),
            send_queue_capacity: s.send_queue_capacity.max(1),
        }
    }
}

/// Everything a connection task needs from the hub.
#[derive(Clone)]
pub struct HubContext {
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Operator notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Connection settings.
    pub config: Arc<ConnectionConfig>,
    /// Cancelled when the hub shuts down.
    pub shutdown: CancellationToken,
}

/// Drive one upgraded connection until it closes.
///
/// 1. Waits for the `<token>:<role>` frame; rejects with a diagnostic and a
///    policy close, touching nothing else
/// 2. Registers the session, notifies, and sends the welcome frame
/// 3. Echoes every inbound frame and counts it
/// 4. Removes the session (if still registered) and notifies
#[instrument(skip_all, fields(identity = %identity, role = field::Empty, session_id = field::Empty))]
pub async fn run_connection(ws: WebSocket, identity: String, ctx: HubContext) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let Some(first) = await_auth_frame(&mut ws_rx, ctx.config.handshake_timeout).await else {
        debug!("connection ended before authenticating");
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    };

    let role = match AuthFrame::authenticate(&first, &ctx.config.auth_token) {
        Ok(role) => role,
        Err(e) => {
            counter!(AUTH_FAILURES_TOTAL, "reason" => e.kind()).increment(1);
            warn!(reason = e.kind(), "admission rejected");
            reject(&mut ws_tx, &e).await;
            return;
        }
    };

    let (send_tx, send_rx) = mpsc::channel(ctx.config.send_queue_capacity);
    let session = Arc::new(Session::new(role, identity.clone(), send_tx));
    let span = tracing::Span::current();
    let _ = span.record("role", role.as_str());
    let _ = span.record("session_id", session.id.as_str());

    let mut outbound = tokio::spawn(forward_outbound(
        ws_tx,
        send_rx,
        session.clone(),
        ctx.config.clone(),
        ctx.shutdown.clone(),
    ));

    let count = ctx.registry.add(session.clone());
    info!(count, "client admitted");
    ctx.notifier
        .notify(&RelayEvent::Admitted {
            role,
            identity: identity.clone(),
            count,
        })
        .await;
    if session.send(Arc::from(welcome(role))).await.is_err() {
        debug!("writer gone before welcome");
    }

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let Some(Ok(msg)) = frame else { break };
                session.mark_alive();
                if matches!(msg, Message::Close(_)) {
                    debug!("client sent close frame");
                    break;
                }
                let Some(text) = frame_text(&msg) else { continue };
                let total = session.record_message();
                counter!(MESSAGES_RECEIVED_TOTAL).increment(1);
                debug!(total, message = %text, "received message");
                if let Err(e) = session.send(Arc::from(echo(&text))).await {
                    debug!(error = %e, "echo failed");
                    break;
                }
            }
            _ = &mut outbound => {
                debug!("writer stopped");
                break;
            }
        }
    }

    outbound.abort();
    histogram!(SESSION_DURATION_SECONDS).record(session.age().as_secs_f64());

    if ctx.registry.remove(role, &session.id) {
        let count = ctx.registry.count_of(role);
        info!(count, messages = session.messages_received(), "client disconnected");
        ctx.notifier
            .notify(&RelayEvent::Disconnected {
                role,
                identity,
                count,
            })
            .await;
    } else {
        debug!("session already removed by a broadcast");
    }
}

/// Forward queued frames to the socket and keep the heartbeat.
///
/// Returns when the socket fails, the peer stays silent past the pong
/// timeout, or the hub shuts down. The queue receiver is dropped on return,
/// which makes every later send to the session fail.
async fn forward_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<str>>,
    session: Arc<Session>,
    config: Arc<ConnectionConfig>,
    shutdown: CancellationToken,
) {
    let mut ping = tokio::time::interval(config.heartbeat_interval);
    // first tick is immediate
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(text) = frame else { break };
                if ws_tx.send(Message::Text(text.to_string().into())).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if session.last_pong_elapsed() > config.pong_timeout {
                    warn!(
                        silent_secs = session.last_pong_elapsed().as_secs(),
                        "client unresponsive, disconnecting"
                    );
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            () = shutdown.cancelled() => {
                let _ = ws_tx
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: "server shutting down".to_string().into(),
                    })))
                    .await;
                break;
            }
        }
    }
    let _ = ws_tx.close().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_settings() {
        let settings = HubSettings {
            auth_token: "tok".into(),
            handshake_timeout_secs: 3,
            heartbeat_interval_secs: 15,
            pong_timeout_secs: 45,
            send_queue_capacity: 16,
            ..HubSettings::default()
        };
        let config = ConnectionConfig::from(&settings);
        assert_eq!(config.auth_token, "tok");
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.pong_timeout, Duration::from_secs(45));
        assert_eq!(config.send_queue_capacity, 16);
    }

    #[test]
    fn config_clamps_zero_values() {
        let settings = HubSettings {
            heartbeat_interval_secs: 0,
            send_queue_capacity: 0,
            ..HubSettings::default()
        };
        let config = ConnectionConfig::from(&settings);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(config.send_queue_capacity, 1);
    }
}
