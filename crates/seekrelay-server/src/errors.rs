//! Hub error types.

use seekrelay_core::SessionId;
use thiserror::Error;

/// Failure to hand a frame to a session's writer.
///
/// Ends that session; never propagated past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The session's outbound channel is closed (writer gone).
    #[error("session {0} is closed")]
    Closed(SessionId),
}

/// Startup failures of the hub listeners.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The bound address of a listener could not be read.
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
    /// The Prometheus recorder could not be installed.
    #[error("metrics recorder: {0}")]
    Metrics(String),
}

impl ServerError {
    pub(crate) fn bind(host: &str, port: u16, source: std::io::Error) -> Self {
        Self::Bind {
            addr: format!("{host}:{port}"),
            source,
        }
    }
}

/// Failure to deliver an operator notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP request failed.
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The Bot API answered with a non-success status.
    #[error("notification rejected with status {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_names_session() {
        let err = TransportError::Closed(SessionId::from("s-1"));
        assert_eq!(err.to_string(), "session s-1 is closed");
    }

    #[test]
    fn bind_error_names_address() {
        let err = ServerError::bind(
            "0.0.0.0",
            8765,
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(err.to_string().starts_with("failed to bind 0.0.0.0:8765"));
    }

    #[test]
    fn status_error_display() {
        assert_eq!(
            NotifyError::Status(403).to_string(),
            "notification rejected with status 403"
        );
    }
}
