//! # seekrelay-server
//!
//! The relay hub.
//!
//! - `WebSocket` gateway: admission handshake, per-connection receive loop, heartbeat
//! - [`SessionRegistry`]: the single source of truth for who is connected, per role
//! - [`Dispatcher`]: all-of-role and randomized-majority fan-out with failure cleanup
//! - [`RelayControl`]: the operator command surface, exposed over the admin HTTP listener
//! - Operator notifications, Prometheus metrics, graceful shutdown

#![deny(unsafe_code)]

pub mod control;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod notify;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use control::{CommandReport, RelayControl, RelayStatus};
pub use errors::{NotifyError, ServerError, TransportError};
pub use notify::{LogNotifier, Notifier, RelayEvent, TelegramNotifier};
pub use server::{RelayServer, RunningHub};
pub use shutdown::ShutdownCoordinator;
pub use websocket::dispatcher::{BroadcastMode, BroadcastReport, Dispatcher};
pub use websocket::registry::SessionRegistry;
pub use websocket::session::Session;
