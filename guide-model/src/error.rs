//! Error types for the record model

use thiserror::Error;

/// Errors that can occur while mapping rows to records.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The row's discriminator has no registered decoder. Callers are
    /// expected to skip the row and keep processing its siblings.
    #[error("No registered variant for class \"{0}\"")]
    UnknownVariant(String),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
