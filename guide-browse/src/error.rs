//! Error types for browse operations

use guide_transport::TransportError;
use thiserror::Error;

/// Errors from the fallible browse surface and the startup poll.
///
/// [`QueryEngine::browse`](crate::QueryEngine::browse) absorbs these and
/// returns empty lists; `try_browse` exposes them for callers that need to
/// tell "failed" from "empty".
#[derive(Debug, Error)]
pub enum BrowseError {
    /// The polling loop was asked to stop. Expected termination, not a
    /// fault.
    #[error("Operation cancelled")]
    Cancelled,

    /// The startup poll hit its attempt bound without seeing content.
    #[error("No content after {0} polling attempt(s)")]
    AttemptsExhausted(u32),

    /// One browse round-trip failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] TransportError),
}

/// Result type for browse operations.
pub type Result<T> = std::result::Result<T, BrowseError>;
