//! Error types for connection management

use guide_transport::TransportError;
use thiserror::Error;

/// Errors surfaced through lifecycle observers or returned from manager
/// calls.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The remote service could not be located or bound.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Local network resource acquisition failed.
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// The link was established and then dropped.
    #[error("Connection lost")]
    ConnectionLost,

    /// A transport-level failure outside the bind path.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The background worker is no longer running.
    #[error("Connection worker has shut down")]
    WorkerGone,
}

impl ConnectionError {
    /// Fold a bind-time transport failure into the lifecycle taxonomy.
    pub(crate) fn from_bind_failure(error: TransportError) -> Self {
        match error {
            TransportError::ServiceUnavailable(detail) => ConnectionError::ServiceUnavailable(detail),
            TransportError::Io(detail) => ConnectionError::IoFailure(detail),
            other => ConnectionError::Transport(other),
        }
    }
}

/// Result type for connection operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;
