//! Handler and key registries
//!
//! Algorithm handlers and key material are injected through registries
//! instead of process-global lookup tables, so independent signing runs
//! can carry independent configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::{Hasher, Sha256Hasher, Sha512Hasher};
use crate::keys::{PrivateKey, PublicKey};
use crate::rsa::{RsaSigner, RsaVerifier, Signer, Verifier};

/// Registry of hash, signing and verification handlers, keyed by
/// algorithm name.
pub struct HandlerRegistry {
    hashers: HashMap<String, Arc<dyn Hasher>>,
    signers: HashMap<String, Arc<dyn Signer>>,
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl HandlerRegistry {
    /// An empty registry with no handlers.
    pub fn empty() -> Self {
        Self {
            hashers: HashMap::new(),
            signers: HashMap::new(),
            verifiers: HashMap::new(),
        }
    }

    pub fn register_hasher(&mut self, hasher: Arc<dyn Hasher>) {
        self.hashers.insert(hasher.algorithm().to_string(), hasher);
    }

    pub fn register_signer(&mut self, signer: Arc<dyn Signer>) {
        self.signers.insert(signer.algorithm().to_string(), signer);
    }

    pub fn register_verifier(&mut self, verifier: Arc<dyn Verifier>) {
        self.verifiers.insert(verifier.algorithm().to_string(), verifier);
    }

    pub fn hasher(&self, algorithm: &str) -> Result<Arc<dyn Hasher>> {
        self.hashers
            .get(algorithm)
            .cloned()
            .ok_or_else(|| Error::UnknownHashAlgorithm(algorithm.to_string()))
    }

    pub fn signer(&self, algorithm: &str) -> Result<Arc<dyn Signer>> {
        self.signers
            .get(algorithm)
            .cloned()
            .ok_or_else(|| Error::UnknownSignatureAlgorithm(algorithm.to_string()))
    }

    pub fn verifier(&self, algorithm: &str) -> Result<Arc<dyn Verifier>> {
        self.verifiers
            .get(algorithm)
            .cloned()
            .ok_or_else(|| Error::UnknownSignatureAlgorithm(algorithm.to_string()))
    }
}

impl Default for HandlerRegistry {
    /// The standard handler set: SHA-256 and SHA-512 hashers and the
    /// RSASSA-PKCS1-V1_5 signer (raw hex output) and verifier.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_hasher(Arc::new(Sha256Hasher));
        registry.register_hasher(Arc::new(Sha512Hasher));
        registry.register_signer(Arc::new(RsaSigner::raw()));
        registry.register_verifier(Arc::new(RsaVerifier));
        registry
    }
}

/// Key material indexed by signature name.
///
/// Each named signature resolves to its own key pair entry; the private
/// side is consulted when signing, the public side when verifying.
#[derive(Default, Clone)]
pub struct KeyRegistry {
    private_keys: HashMap<String, PrivateKey>,
    public_keys: HashMap<String, PublicKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_private_key(&mut self, signature_name: impl Into<String>, key: PrivateKey) {
        self.private_keys.insert(signature_name.into(), key);
    }

    pub fn add_public_key(&mut self, signature_name: impl Into<String>, key: PublicKey) {
        self.public_keys.insert(signature_name.into(), key);
    }

    pub fn private_key(&self, signature_name: &str) -> Option<&PrivateKey> {
        self.private_keys.get(signature_name)
    }

    pub fn public_key(&self, signature_name: &str) -> Option<&PublicKey> {
        self.public_keys.get(signature_name)
    }
}
