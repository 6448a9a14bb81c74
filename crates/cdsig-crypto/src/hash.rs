//! Descriptor hashing
//!
//! A [`Hasher`] names a hash algorithm and hands out fresh digest
//! instances. [`hash_component_descriptor`] combines normalization and
//! hashing into the `DigestSpec` that signatures are computed over.

use cdsig_types::{ComponentDescriptor, DigestSpec, JSON_NORMALISATION_V1};
use sha2::digest::DynDigest;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Result;

/// Canonical name of the SHA-256 algorithm.
pub const SHA256: &str = "sha256";
/// Canonical name of the SHA-512 algorithm.
pub const SHA512: &str = "sha512";

/// A named hash algorithm that can produce fresh digest instances.
///
/// Digest instances are stateful; callers that reuse one must reset it
/// between uses.
pub trait Hasher: Send + Sync {
    /// The canonical lowercase algorithm name, e.g. `sha256`.
    fn algorithm(&self) -> &'static str;

    /// Create a fresh digest instance.
    fn create(&self) -> Box<dyn DynDigest + Send>;
}

/// SHA-256 hasher.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn algorithm(&self) -> &'static str {
        SHA256
    }

    fn create(&self) -> Box<dyn DynDigest + Send> {
        Box::new(Sha256::new())
    }
}

/// SHA-512 hasher.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha512Hasher;

impl Hasher for Sha512Hasher {
    fn algorithm(&self) -> &'static str {
        SHA512
    }

    fn create(&self) -> Box<dyn DynDigest + Send> {
        Box::new(Sha512::new())
    }
}

/// Normalize a component descriptor and hash the canonical bytes.
///
/// The returned spec records the hash algorithm name and
/// `jsonNormalisation/v1`, with the digest as lowercase hex.
pub fn hash_component_descriptor(
    cd: &ComponentDescriptor,
    hasher: &dyn Hasher,
) -> Result<DigestSpec> {
    let normalised = cdsig_normalize::normalise(cd)?;
    let mut digest = hasher.create();
    digest.update(&normalised);
    let value = hex::encode(digest.finalize());
    Ok(DigestSpec::new(
        hasher.algorithm(),
        JSON_NORMALISATION_V1,
        value,
    ))
}
