//! Error types shared by the hub and the clients.

use thiserror::Error;

/// A role name that is neither `seeker` nor `switcher`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown role '{0}', expected 'seeker' or 'switcher'")]
pub struct UnknownRole(pub String);

/// Rejection of the first frame of a connection.
///
/// Terminal for that connection only.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The frame has no `:` separator.
    #[error("auth frame is not of the form <token>:<role>")]
    Malformed,
    /// The token does not match the configured secret.
    #[error("auth token mismatch")]
    TokenMismatch,
    /// The role part is not a known role.
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
}

impl AuthError {
    /// Text frame sent to the client before the connection is closed.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Malformed | Self::TokenMismatch => {
                "Authentication failed: Invalid token or format".to_string()
            }
            Self::UnknownRole(UnknownRole(role)) => {
                format!("Invalid client type: {role}. Must be 'seeker' or 'switcher'")
            }
        }
    }

    /// Reason attached to the policy-violation close frame.
    pub const fn close_reason(&self) -> &'static str {
        match self {
            Self::Malformed | Self::TokenMismatch => "Unauthorized",
            Self::UnknownRole(_) => "Invalid client type",
        }
    }

    /// Short classification string for logging/metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::TokenMismatch => "token_mismatch",
            Self::UnknownRole(_) => "unknown_role",
        }
    }
}

/// A timecode spec that cannot be turned into a second offset.
///
/// Logged locally on the client; no reply is sent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Nothing followed the `/seek` command.
    #[error("empty timecode")]
    Empty,
    /// Input matches none of the accepted grammars.
    #[error("invalid timecode format: {0}")]
    Malformed(String),
    /// A numeric field does not fit the offset type.
    #[error("timecode out of range: {0}")]
    OutOfRange(String),
}
