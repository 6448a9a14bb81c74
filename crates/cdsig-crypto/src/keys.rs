//! Key material
//!
//! Private and public keys are closed enums so that new algorithms extend
//! the type rather than widening a trait object surface. Only RSA is
//! supported today; the descriptor format fixes RSASSA-PKCS1-V1_5 as the
//! signature algorithm.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{Error, Result};

/// A signing key.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
}

impl PrivateKey {
    /// Parse a PEM-encoded private key.
    ///
    /// Accepts both PKCS#8 (`PRIVATE KEY`) and PKCS#1 (`RSA PRIVATE KEY`)
    /// documents.
    pub fn from_pem(pem_data: &str) -> Result<Self> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem_data) {
            return Ok(Self::Rsa(Box::new(key)));
        }
        let key = RsaPrivateKey::from_pkcs1_pem(pem_data)
            .map_err(|e| Error::InvalidKey(format!("not a PKCS#8 or PKCS#1 RSA key: {e}")))?;
        Ok(Self::Rsa(Box::new(key)))
    }

    /// Parse a DER-encoded PKCS#8 private key.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| Error::InvalidKey(format!("invalid PKCS#8 DER: {e}")))?;
        Ok(Self::Rsa(Box::new(key)))
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Rsa(key) => PublicKey::Rsa(key.to_public_key()),
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa(_) => f.write_str("PrivateKey::Rsa(..)"),
        }
    }
}

/// A verification key.
#[derive(Debug, Clone, PartialEq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
}

impl PublicKey {
    /// Parse a PEM-encoded public key.
    ///
    /// Accepts both SPKI (`PUBLIC KEY`) and PKCS#1 (`RSA PUBLIC KEY`)
    /// documents.
    pub fn from_pem(pem_data: &str) -> Result<Self> {
        if let Ok(key) = RsaPublicKey::from_public_key_pem(pem_data) {
            return Ok(Self::Rsa(key));
        }
        let key = RsaPublicKey::from_pkcs1_pem(pem_data)
            .map_err(|e| Error::InvalidKey(format!("not an SPKI or PKCS#1 RSA key: {e}")))?;
        Ok(Self::Rsa(key))
    }

    /// Parse a DER-encoded SubjectPublicKeyInfo, as found in certificates.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| Error::InvalidKey(format!("invalid SPKI DER: {e}")))?;
        Ok(Self::Rsa(key))
    }
}
