//! Error types for the transport boundary

use thiserror::Error;

/// Errors that can occur while talking to a content-directory server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote service could not be located on the network.
    #[error("Content-directory service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Local resource acquisition failed (socket, port, interface).
    #[error("I/O error: {0}")]
    Io(String),

    /// Network or HTTP communication error during a round-trip.
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// Response could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// SOAP fault returned by the server.
    #[error("SOAP fault: error code {0}")]
    Fault(u16),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
