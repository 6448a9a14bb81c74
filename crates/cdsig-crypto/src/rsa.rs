//! RSASSA-PKCS1-V1_5 signing and verification
//!
//! Signatures are computed over the raw digest bytes (the hex-decoded
//! descriptor digest), not over a message. The signature value is encoded
//! either as bare hex or as a PEM document depending on the media type the
//! signer was configured with.

use cdsig_types::{SignatureSpec, MEDIA_TYPE_PEM, MEDIA_TYPE_RSA_SIGNATURE, RSA_PKCS1_V15};
use rsa::sha2::{Sha256, Sha512};
use rsa::Pkcs1v15Sign;

use crate::error::{Error, Result};
use crate::hash::{SHA256, SHA512};
use crate::keys::{PrivateKey, PublicKey};
use crate::pem_util;

/// Per-call signing inputs.
pub struct SigningContext<'a> {
    /// Hash algorithm the digest was produced with, e.g. `sha256`.
    pub hash_algorithm: &'a str,
    pub private_key: &'a PrivateKey,
    /// Expected issuer distinguished name, recorded in the signature.
    /// Empty if unset.
    pub issuer: &'a str,
}

/// Produces a signature over a descriptor digest.
pub trait Signer: Send + Sync {
    /// The signature algorithm name, e.g. `RSASSA-PKCS1-V1_5`.
    fn algorithm(&self) -> &'static str;

    /// Sign the hex-encoded digest.
    fn sign(&self, digest_hex: &str, ctx: &SigningContext<'_>) -> Result<SignatureSpec>;
}

/// Checks a signature over a descriptor digest.
pub trait Verifier: Send + Sync {
    fn algorithm(&self) -> &'static str;

    /// Verify `spec` against the hex-encoded digest it claims to cover.
    fn verify(
        &self,
        digest_hex: &str,
        hash_algorithm: &str,
        spec: &SignatureSpec,
        key: &PublicKey,
    ) -> Result<()>;
}

/// RSASSA-PKCS1-V1_5 signer with a fixed output media type.
#[derive(Debug, Clone, Copy)]
pub struct RsaSigner {
    media_type: &'static str,
}

impl RsaSigner {
    /// Emit the signature as bare lowercase hex
    /// (`application/vnd.ocm.signature.rsa`).
    pub fn raw() -> Self {
        Self {
            media_type: MEDIA_TYPE_RSA_SIGNATURE,
        }
    }

    /// Emit the signature as a PEM `SIGNATURE` block
    /// (`application/x-pem-file`).
    pub fn pem() -> Self {
        Self {
            media_type: MEDIA_TYPE_PEM,
        }
    }
}

impl Signer for RsaSigner {
    fn algorithm(&self) -> &'static str {
        RSA_PKCS1_V15
    }

    fn sign(&self, digest_hex: &str, ctx: &SigningContext<'_>) -> Result<SignatureSpec> {
        let digest = hex::decode(digest_hex)?;
        let padding = pkcs1v15_padding(ctx.hash_algorithm)?;
        let PrivateKey::Rsa(key) = ctx.private_key;
        let raw = key
            .sign(padding, &digest)
            .map_err(|e| Error::Signing(e.to_string()))?;

        let value = match self.media_type {
            MEDIA_TYPE_RSA_SIGNATURE => hex::encode(raw),
            MEDIA_TYPE_PEM => pem_util::encode_signature(&raw, RSA_PKCS1_V15)?,
            other => return Err(Error::UnsupportedMediaType(other.to_string())),
        };
        Ok(SignatureSpec {
            algorithm: RSA_PKCS1_V15.to_string(),
            value,
            media_type: self.media_type.to_string(),
            issuer: ctx.issuer.to_string(),
        })
    }
}

/// RSASSA-PKCS1-V1_5 verifier. Decodes the signature value according to
/// its recorded media type.
#[derive(Debug, Default, Clone, Copy)]
pub struct RsaVerifier;

impl Verifier for RsaVerifier {
    fn algorithm(&self) -> &'static str {
        RSA_PKCS1_V15
    }

    fn verify(
        &self,
        digest_hex: &str,
        hash_algorithm: &str,
        spec: &SignatureSpec,
        key: &PublicKey,
    ) -> Result<()> {
        let digest = hex::decode(digest_hex)?;
        let raw = match spec.media_type.as_str() {
            MEDIA_TYPE_RSA_SIGNATURE => hex::decode(&spec.value)?,
            MEDIA_TYPE_PEM => {
                let (raw, algorithm) = pem_util::decode_signature(&spec.value)?;
                if let Some(algorithm) = algorithm {
                    if algorithm != RSA_PKCS1_V15 {
                        return Err(Error::Verification(format!(
                            "signature block declares algorithm {algorithm}, expected {RSA_PKCS1_V15}"
                        )));
                    }
                }
                raw
            }
            other => return Err(Error::UnsupportedMediaType(other.to_string())),
        };

        let padding = pkcs1v15_padding(hash_algorithm)?;
        let PublicKey::Rsa(key) = key;
        key.verify(padding, &digest, &raw)
            .map_err(|e| Error::Verification(format!("signature does not match digest: {e}")))
    }
}

fn pkcs1v15_padding(hash_algorithm: &str) -> Result<Pkcs1v15Sign> {
    match hash_algorithm {
        SHA256 => Ok(Pkcs1v15Sign::new::<Sha256>()),
        SHA512 => Ok(Pkcs1v15Sign::new::<Sha512>()),
        other => Err(Error::UnknownHashAlgorithm(other.to_string())),
    }
}
