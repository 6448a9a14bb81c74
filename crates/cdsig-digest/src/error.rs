//! Error types for resource digesting

use thiserror::Error;

/// Errors that can occur while fetching and hashing resource content
#[derive(Error, Debug)]
pub enum Error {
    /// A remote fetch returned a non-success status
    #[error("fetch of {url} failed with status {status}: {body}")]
    FetchFailed {
        url: String,
        status: u16,
        body: String,
    },

    /// A transport-level HTTP failure
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An OCI registry interaction failed
    #[error("oci registry error: {0}")]
    Oci(String),

    /// A blob could not be resolved
    #[error("blob resolution error: {0}")]
    Blob(String),

    /// Streaming resource content failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The operation was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for resource digesting
pub type Result<T> = std::result::Result<T, Error>;
