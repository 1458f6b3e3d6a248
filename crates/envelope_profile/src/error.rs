//! Error types for profile construction.

use thiserror::Error;

/// Errors that can occur while building a profile.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is inconsistent and no profile can be built from it.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("malformed configuration: {0}")]
    MalformedConfig(#[from] serde_json::Error),

    /// A transaction or interval was rejected by the data model.
    #[error(transparent)]
    Model(#[from] envelope_model::Error),
}

/// Result type alias for profile operations.
pub type Result<T> = std::result::Result<T, Error>;
