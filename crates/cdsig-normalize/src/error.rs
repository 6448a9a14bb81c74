//! Error types for normalization

use thiserror::Error;

/// Errors that can occur while normalizing a component descriptor.
#[derive(Error, Debug)]
pub enum Error {
    /// A component reference lacks the digest required for normalization
    #[error("missing digest in component reference {name}:{version}")]
    MissingReferenceDigest { name: String, version: String },

    /// A resource with non-None access lacks a digest
    #[error("missing digest in resource {name}:{version}")]
    MissingResourceDigest { name: String, version: String },

    /// A resource with None or absent access carries a digest
    #[error("digest with empty (None) access not allowed in resource {name}:{version}")]
    DigestWithNoneAccess { name: String, version: String },

    /// Canonical JSON serialization failed
    #[error("unable to serialize normalized descriptor: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for normalization.
pub type Result<T> = std::result::Result<T, Error>;
