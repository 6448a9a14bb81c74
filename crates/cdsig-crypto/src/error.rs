//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur during hashing, signing and verification
#[derive(Error, Debug)]
pub enum Error {
    /// Signing failed
    #[error("signing error: {0}")]
    Signing(String),

    /// Signature verification failed
    #[error("verification error: {0}")]
    Verification(String),

    /// A key could not be parsed or has an unsupported format
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// No hasher is registered for the requested algorithm
    #[error("unknown hash algorithm: {0}")]
    UnknownHashAlgorithm(String),

    /// No signer or verifier is registered for the requested algorithm
    #[error("unknown signature algorithm: {0}")]
    UnknownSignatureAlgorithm(String),

    /// The signature value media type is not supported
    #[error("unsupported signature media type: {0}")]
    UnsupportedMediaType(String),

    /// A PEM document could not be parsed or lacks expected blocks
    #[error("invalid PEM: {0}")]
    Pem(String),

    /// A certificate could not be parsed or failed chain validation
    #[error("invalid certificate: {0}")]
    Certificate(String),

    /// A digest value is not valid lowercase hex
    #[error("invalid digest value: {0}")]
    InvalidDigest(#[from] hex::FromHexError),

    /// Descriptor normalization failed
    #[error(transparent)]
    Normalise(#[from] cdsig_normalize::Error),
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, Error>;
