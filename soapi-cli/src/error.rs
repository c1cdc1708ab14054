//! Error types for soapcli
//!
//! Every failure of a run maps onto one of these variants; the orchestrator
//! and `main` turn any of them into a non-zero exit status.

use thiserror::Error;

/// Main error type for the soapi_cli crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad or missing configuration (location selection, arguments, TOML)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playlist build was given no entries
    #[error("Playlist is empty: at least one song is required")]
    EmptyPlaylist,

    /// A playlist entry does not resolve to a readable file
    #[error("Invalid media reference '{entry}': {reason}")]
    InvalidMediaReference { entry: String, reason: String },

    /// Serving resource could not be acquired
    #[error("Server failed to start: {0}")]
    ServerStart(String),

    /// Serving resource failed after it was listening
    #[error("Playback error: {0}")]
    Playback(String),

    /// Operation not valid in the server's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The remote trigger call failed
    #[error("Actuation failed: {0}")]
    ActuationFailed(String),

    /// Unit stopped because another unit failed first
    #[error("Cancelled")]
    Cancelled,

    /// Other errors (task panics, join failures)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<soapi_common::Error> for Error {
    fn from(err: soapi_common::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Convenience Result type using soapi_cli Error
pub type Result<T> = std::result::Result<T, Error>;
