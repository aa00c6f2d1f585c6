use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(#[from] guide_connection::ConnectionError),

    #[error("Browse error: {0}")]
    Browse(#[from] guide_browse::BrowseError),

    #[error("Logging setup error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}
