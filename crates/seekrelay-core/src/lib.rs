//! # seekrelay-core
//!
//! Shared vocabulary for the seekrelay hub and its media clients.
//!
//! - **Roles**: [`Role`] distinguishes seekers (drive a media player) from
//!   switchers (perform a local action)
//! - **IDs**: [`SessionId`] branded newtype for hub sessions
//! - **Wire protocol**: auth frame, command frames, seek acks and hub texts
//! - **Timecodes**: [`TimecodeSpec`] parsing and client-side resolution
//! - **Errors**: [`AuthError`], [`ResolutionError`]
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod protocol;
pub mod role;
pub mod timecode;

pub use errors::{AuthError, ResolutionError, UnknownRole};
pub use ids::SessionId;
pub use protocol::{AuthFrame, Command};
pub use role::Role;
pub use timecode::TimecodeSpec;
