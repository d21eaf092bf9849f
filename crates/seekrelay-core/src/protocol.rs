//! Text-frame wire protocol between the hub and its clients.
//!
//! ```text
//! client → hub   "<token>:<role>"                 first frame
//! hub → client   "Authentication successful! ..."  or diagnostic + close 1008
//! hub → client   "/seek <spec>" | "/switch"        commands
//! client → hub   "seeked <seconds> of <total>"     seek ack
//! hub → client   "Server received: <text>"         echo of any other frame
//! ```

use std::fmt;

use crate::errors::AuthError;
use crate::role::Role;

/// Prefix of the hub's echo of unrecognised inbound frames.
pub const ECHO_PREFIX: &str = "Server received: ";

const SEEK_PREFIX: &str = "/seek ";
const SWITCH_FRAME: &str = "/switch";
const WELCOME_PREFIX: &str = "Authentication successful!";
const REJECT_PREFIXES: [&str; 2] = ["Authentication failed", "Invalid client type"];

/// The parsed first frame of a connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthFrame<'a> {
    /// Token part (everything before the first `:`).
    pub token: &'a str,
    /// Role part (everything after the first `:`), not yet validated.
    pub role: &'a str,
}

impl<'a> AuthFrame<'a> {
    /// Split on the first colon.
    pub fn parse(frame: &'a str) -> Result<Self, AuthError> {
        let (token, role) = frame.split_once(':').ok_or(AuthError::Malformed)?;
        Ok(Self { token, role })
    }

    /// Format the frame a client sends right after connecting.
    pub fn format(token: &str, role: Role) -> String {
        format!("{token}:{role}")
    }

    /// Validate a first frame against the shared secret.
    ///
    /// The token must match exactly; the role is case-insensitive.
    pub fn authenticate(frame: &str, expected_token: &str) -> Result<Role, AuthError> {
        let parsed = AuthFrame::parse(frame)?;
        if parsed.token != expected_token {
            return Err(AuthError::TokenMismatch);
        }
        Ok(parsed.role.parse::<Role>()?)
    }
}

/// A command the hub fans out to clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Seek to a timecode spec, resolved on the client.
    Seek(String),
    /// Trigger the switcher's local action.
    Switch,
}

impl Command {
    /// Role a command is addressed to.
    pub const fn target(&self) -> Role {
        match self {
            Self::Seek(_) => Role::Seeker,
            Self::Switch => Role::Switcher,
        }
    }

    /// Recognise a command frame. Anything else is `None`.
    ///
    /// `"/seek"` without a trailing space is not a seek.
    pub fn parse(frame: &str) -> Option<Self> {
        if let Some(spec) = frame.strip_prefix(SEEK_PREFIX) {
            return Some(Self::Seek(spec.trim().to_string()));
        }
        (frame == SWITCH_FRAME).then_some(Self::Switch)
    }

    /// Render as a wire frame.
    pub fn to_frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seek(spec) => write!(f, "{SEEK_PREFIX}{spec}"),
            Self::Switch => f.write_str(SWITCH_FRAME),
        }
    }
}

/// A seeker's reply after it applied a seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeekAck {
    /// Resolved offset in seconds.
    pub seconds: u64,
    /// Total media duration in seconds (0 when unknown).
    pub total: u64,
}

impl fmt::Display for SeekAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seeked {} of {}", self.seconds, self.total)
    }
}

/// Confirmation frame sent after a successful admission.
pub fn welcome(role: Role) -> String {
    format!("{WELCOME_PREFIX} Welcome to the WebSocket server as {role}.")
}

/// Hub echo of an unrecognised inbound frame.
pub fn echo(text: &str) -> String {
    format!("{ECHO_PREFIX}{text}")
}

/// How a client should read an informational hub frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HubNotice {
    /// Admission confirmed.
    Welcome,
    /// Admission rejected; a policy close follows.
    Rejected,
    /// Echo of something this client sent.
    Echo,
    /// Anything else.
    Other,
}

impl HubNotice {
    /// Classify a frame that is not a command.
    pub fn classify(frame: &str) -> Self {
        if frame.starts_with(WELCOME_PREFIX) {
            Self::Welcome
        } else if REJECT_PREFIXES.iter().any(|p| frame.starts_with(p)) {
            Self::Rejected
        } else if frame.starts_with(ECHO_PREFIX) {
            Self::Echo
        } else {
            Self::Other
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
