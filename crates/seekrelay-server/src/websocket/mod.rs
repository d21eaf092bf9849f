//! `WebSocket` admission, session bookkeeping, and command fan-out.

pub mod admission;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod session;
