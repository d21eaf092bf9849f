//! Client session loop.
//!
//! ```text
//! Disconnected ──► Connecting ──► Authenticating ──► Active
//!      ▲               │                                │
//!      └── delay ◄─────┴──────── close / error ◄────────┘
//! ```
//!
//! The auth frame is sent and the session goes straight to `Active`; the
//! hub's answer is the first frame read there. A rejection is followed by
//! the hub's policy close, which takes the normal retry path.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use seekrelay_core::protocol::{HubNotice, SeekAck};
use seekrelay_core::{AuthFrame, Command, Role, TimecodeSpec};
use seekrelay_settings::ClientSettings;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::adapter::MediaControl;
use crate::errors::TransportError;
use crate::switch::SwitchAction;

/// Where the connection to the hub stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// Not connected; waiting out the reconnect delay or stopped.
    Disconnected,
    /// WebSocket handshake in progress.
    Connecting,
    /// Auth frame being sent.
    Authenticating,
    /// Receiving frames.
    Active,
}

/// What to do after a frame was handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Send this frame back to the hub.
    Reply(String),
    /// Acted on locally; nothing to send.
    Handled,
    /// Not actionable for this client.
    Ignored,
}

/// One client's connection to the hub, reconnecting forever until cancelled.
pub struct ClientSession {
    role: Role,
    auth_token: String,
    server_url: String,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    media: Arc<dyn MediaControl>,
    switch: SwitchAction,
    state: watch::Sender<LinkState>,
}

impl ClientSession {
    /// Build a session from client settings.
    pub fn new(settings: &ClientSettings, media: Arc<dyn MediaControl>) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            role: settings.role,
            auth_token: settings.auth_token.clone(),
            server_url: settings.server_url.clone(),
            connect_timeout: settings.connect_timeout(),
            reconnect_delay: settings.reconnect_delay(),
            media,
            switch: SwitchAction::from_command(&settings.switch_command),
            state,
        }
    }

    /// Role this session registers as.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Watch link state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: LinkState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = ?prev, to = ?next, "link state");
        }
    }

    /// Connect, serve, and reconnect after a flat delay until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(role = %self.role, server = %self.server_url, "client starting");
        loop {
            let result = tokio::select! {
                r = self.connect_cycle() => r,
                () = cancel.cancelled() => break,
            };
            self.set_state(LinkState::Disconnected);
            match result {
                Ok(()) => info!("connection closed by hub"),
                Err(e) => warn!(error = %e, "connection lost"),
            }
            info!(delay_secs = self.reconnect_delay.as_secs(), "reconnecting after delay");
            tokio::select! {
                () = tokio::time::sleep(self.reconnect_delay) => {}
                () = cancel.cancelled() => break,
            }
        }
        self.set_state(LinkState::Disconnected);
        info!("client stopped");
    }

    /// One connection from handshake to close.
    ///
    /// `Ok` when the hub closed the connection cleanly.
    #[instrument(skip_all, fields(role = %self.role, server = %self.server_url))]
    pub async fn connect_cycle(&self) -> Result<(), TransportError> {
        self.set_state(LinkState::Connecting);
        let (ws, _) = tokio::time::timeout(self.connect_timeout, connect_async(self.server_url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::Connect(Box::new(e)))?;
        info!("connected to hub");
        let (mut tx, mut rx) = ws.split();

        self.set_state(LinkState::Authenticating);
        tx.send(Message::text(AuthFrame::format(&self.auth_token, self.role)))
            .await
            .map_err(|_| TransportError::Closed)?;
        self.set_state(LinkState::Active);

        while let Some(msg) = rx.next().await {
            let msg = msg.map_err(|e| TransportError::Receive(Box::new(e)))?;
            let text = match msg {
                Message::Text(t) => t.to_string(),
                Message::Binary(b) => match String::from_utf8(b.to_vec()) {
                    Ok(t) => t,
                    Err(_) => continue,
                },
                Message::Close(frame) => {
                    debug!(?frame, "close frame from hub");
                    return Ok(());
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };
            debug!(frame = %text, "received");
            if let FrameOutcome::Reply(reply) = self.handle_frame(&text).await {
                tx.send(Message::text(reply))
                    .await
                    .map_err(|_| TransportError::Closed)?;
            }
        }
        Ok(())
    }

    /// Act on one frame from the hub.
    ///
    /// Commands addressed to the other role, informational texts, and
    /// anything unrecognised are ignored.
    pub async fn handle_frame(&self, frame: &str) -> FrameOutcome {
        match Command::parse(frame) {
            Some(Command::Seek(spec)) if self.role == Role::Seeker => self.apply_seek(&spec).await,
            Some(Command::Switch) if self.role == Role::Switcher => {
                if let Err(e) = self.switch.start() {
                    error!(error = %e, "switch action failed to start");
                }
                FrameOutcome::Handled
            }
            Some(command) => {
                debug!(%command, "command addressed to another role");
                FrameOutcome::Ignored
            }
            None => {
                match HubNotice::classify(frame) {
                    HubNotice::Welcome => info!(text = frame, "admitted by hub"),
                    HubNotice::Rejected => error!(text = frame, "hub rejected credentials"),
                    HubNotice::Echo | HubNotice::Other => debug!(text = frame, "hub message"),
                }
                FrameOutcome::Ignored
            }
        }
    }

    /// Resolve a timecode, seek, and build the ack.
    ///
    /// A spec that does not parse is logged and produces no reply. A failed
    /// seek command is logged and still acknowledged.
    async fn apply_seek(&self, spec: &str) -> FrameOutcome {
        let parsed = match TimecodeSpec::parse(spec) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(spec, error = %e, "invalid timecode");
                return FrameOutcome::Ignored;
            }
        };
        let duration = if parsed.needs_duration() {
            self.media.get_duration().await
        } else {
            0
        };
        let seconds = parsed.resolve(duration, &mut rand::rng());

        info!(spec, seconds, "seek command received");
        match self.media.send_command(&format!("seek {seconds}")).await {
            Ok(reply) => debug!(reply = %reply, "player answered seek"),
            Err(e) => warn!(error = %e, "seek command failed"),
        }
        let total = self.media.get_duration().await;
        FrameOutcome::Reply(SeekAck { seconds, total }.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
