//! # seekrelay-client
//!
//! The client side of the relay. A client registers with the hub as a
//! seeker or a switcher and acts on the commands addressed to its role.
//!
//! - [`session::ClientSession`]: connect, authenticate, receive, reconnect
//! - [`adapter::MediaControl`]: text-protocol access to the local player,
//!   with [`adapter::VlcRemote`] speaking VLC's `rc` interface
//! - [`player::PlayerProcess`]: the player a seeker launches and owns
//! - [`switch::SwitchAction`]: what a switcher runs on `/switch`

#![deny(unsafe_code)]

pub mod adapter;
pub mod errors;
pub mod player;
pub mod session;
pub mod switch;

pub use adapter::{MediaControl, VlcRemote};
pub use errors::{AdapterError, TransportError};
pub use player::PlayerProcess;
pub use session::{ClientSession, FrameOutcome, LinkState};
pub use switch::SwitchAction;
