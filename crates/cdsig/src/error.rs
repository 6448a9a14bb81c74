//! Error types for the signing engine
//!
//! Walk errors always name the component version (and where applicable
//! the resource or reference) they occurred at, so failures deep in the
//! reference graph remain attributable.

use cdsig_types::NameVersion;
use thiserror::Error;

/// Errors that can occur during recursive digesting, signing and
/// verification
#[derive(Error, Debug)]
pub enum Error {
    /// A reference or resource is missing a digest that is required
    #[error("missing digest for {what} in component version {component}")]
    MissingDigest {
        component: NameVersion,
        what: String,
    },

    /// A freshly calculated digest contradicts a stored one
    #[error("digest mismatch for {what} in component version {component}: calculated {calculated}, stored {stored}")]
    DigestMismatch {
        component: NameVersion,
        what: String,
        calculated: String,
        stored: String,
    },

    /// A hash, normalization or signature algorithm is not known
    #[error("unknown {kind} algorithm {name}")]
    UnknownAlgorithm { kind: &'static str, name: String },

    /// A resource access kind cannot be digested
    #[error("unsupported access type {kind} for resource {resource} in component version {component}")]
    UnsupportedAccessType {
        component: NameVersion,
        resource: String,
        kind: String,
    },

    /// The requested signature is not present on the descriptor
    #[error("signature {name} not found in component version {component}")]
    SignatureNotFound {
        component: NameVersion,
        name: String,
    },

    /// No signature could be verified with the available key material
    #[error("no verifiable signature found in component version {component}")]
    NoVerifiableSignature { component: NameVersion },

    /// No key is registered for the requested signature name
    #[error("no {kind} key for signature {name}")]
    KeyNotFound { kind: &'static str, name: String },

    /// A certificate chain embedded in a signature failed validation
    #[error("certificate for signature {name} invalid: {reason}")]
    CertificateInvalid { name: String, reason: String },

    /// The issuer recorded in a signature contradicts the expected one
    #[error("signature issuer {actual} does not match expected issuer {expected}")]
    IssuerMismatch { expected: String, actual: String },

    /// A component version could not be resolved
    #[error("cannot resolve component version {component}: {reason}")]
    ResolutionFailed {
        component: NameVersion,
        reason: String,
    },

    /// The reference graph contains a cycle
    #[error("circular component reference: {path}")]
    CircularReference { path: String },

    /// The walk was cancelled
    #[error("operation cancelled at component version {component}")]
    Cancelled { component: NameVersion },

    /// Normalization of a descriptor failed
    #[error("component version {component}: {source}")]
    Normalise {
        component: NameVersion,
        source: cdsig_normalize::Error,
    },

    /// A cryptographic operation failed
    #[error(transparent)]
    Crypto(#[from] cdsig_crypto::Error),

    /// Fetching or hashing resource content failed
    #[error("resource {resource} in component version {component}: {source}")]
    Digest {
        component: NameVersion,
        resource: String,
        source: cdsig_digest::Error,
    },

    /// Requesting a timestamp failed
    #[error("timestamp for signature {name}: {source}")]
    Timestamp {
        name: String,
        source: cdsig_tsa::Error,
    },

    /// The engine options are incomplete or contradictory
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

/// Result type for the signing engine
pub type Result<T> = std::result::Result<T, Error>;
