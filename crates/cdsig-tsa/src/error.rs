//! Error types for timestamp operations

use thiserror::Error;

/// Errors that can occur when requesting or parsing timestamps
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(String),

    /// ASN.1 encoding/decoding error
    #[error("ASN.1 error: {0}")]
    Asn1(String),

    /// The authority rejected the request or returned no token
    #[error("invalid timestamp response: {0}")]
    InvalidResponse(String),

    /// A timestamp token could not be parsed
    #[error("failed to parse timestamp token: {0}")]
    Parse(String),

    /// A PEM-encoded token is malformed
    #[error("invalid timestamp PEM: {0}")]
    Pem(String),
}

/// Result type for timestamp operations
pub type Result<T> = std::result::Result<T, Error>;
