//! Cryptographic primitives for component descriptor signing
//!
//! This crate bundles descriptor hashing, RSASSA-PKCS1-V1_5 signing and
//! verification, PEM signature encoding and X.509 chain validation behind
//! registries suitable for dependency injection.

pub mod error;
pub mod hash;
pub mod keys;
pub mod pem_util;
pub mod registry;
pub mod rsa;
pub mod x509;

pub use crate::error::{Error, Result};
pub use crate::hash::{hash_component_descriptor, Hasher, Sha256Hasher, Sha512Hasher, SHA256, SHA512};
pub use crate::keys::{PrivateKey, PublicKey};
pub use crate::registry::{HandlerRegistry, KeyRegistry};
pub use crate::rsa::{RsaSigner, RsaVerifier, Signer, SigningContext, Verifier};
pub use crate::x509::{match_distinguished_name, verify_certificate_chain, CertificateInfo};
