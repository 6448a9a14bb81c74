//! Signature verification
//!
//! A signature is only accepted when the stored descriptor digest can be
//! reproduced from the descriptor itself; the signature check alone never
//! suffices. Public keys come from the key registry or, for PEM encoded
//! signatures, from an embedded certificate chain validated against the
//! configured roots.

use cdsig_crypto::{
    hash_component_descriptor, match_distinguished_name, pem_util, verify_certificate_chain,
    CertificateInfo, PublicKey,
};
use cdsig_types::{
    ComponentDescriptor, DigestSpec, NameVersion, Signature, JSON_NORMALISATION_V1, MEDIA_TYPE_PEM,
};

use crate::error::{Error, Result};
use crate::options::Options;

/// Verify the named signatures of a descriptor.
///
/// Every listed signature that is present on the descriptor must verify;
/// a missing one is skipped. Returns the digest of the signature matching
/// the configured signature name, if it was verified.
pub(crate) fn verify_signatures(
    cd: &ComponentDescriptor,
    nv: &NameVersion,
    names: &[String],
    opts: &Options,
) -> Result<Option<DigestSpec>> {
    let mut spec = None;
    let mut found = 0usize;

    for name in names {
        let Some(sig) = cd.signature(name) else {
            continue;
        };

        let key = match opts.keys.public_key(name) {
            Some(key) => key.clone(),
            None => {
                tracing::debug!(signature = %name, "no public key registered, extracting from signature");
                public_key_from_signature(sig, opts)?
            }
        };

        let verifier = opts
            .registry
            .verifier(&sig.signature.algorithm)
            .map_err(|_| Error::UnknownAlgorithm {
                kind: "signature",
                name: sig.signature.algorithm.clone(),
            })?;

        if sig.digest.normalisation_algorithm != JSON_NORMALISATION_V1 {
            return Err(Error::UnknownAlgorithm {
                kind: "normalisation",
                name: sig.digest.normalisation_algorithm.clone(),
            });
        }
        let hasher = opts
            .registry
            .hasher(&sig.digest.hash_algorithm)
            .map_err(|_| Error::UnknownAlgorithm {
                kind: "hash",
                name: sig.digest.hash_algorithm.clone(),
            })?;

        // recompute the digest; the stored one is attacker-controlled
        let computed = hash_component_descriptor(cd, hasher.as_ref())?;
        if computed.value != sig.digest.value {
            return Err(Error::DigestMismatch {
                component: nv.clone(),
                what: format!("signature {name}"),
                calculated: computed.value,
                stored: sig.digest.value.clone(),
            });
        }

        verifier.verify(&sig.digest.value, &sig.digest.hash_algorithm, &sig.signature, &key)?;
        tracing::debug!(signature = %name, cv = %nv, "signature verified");
        found += 1;

        if opts.signature_name.as_deref() == Some(name.as_str()) {
            spec = Some(sig.digest.clone());
        }
    }

    if found == 0 && !opts.do_sign() {
        return Err(Error::NoVerifiableSignature {
            component: nv.clone(),
        });
    }
    Ok(spec)
}

/// Extract and validate the public key from a PEM-encoded signature
/// value carrying its certificate chain.
pub(crate) fn public_key_from_signature(sig: &Signature, opts: &Options) -> Result<PublicKey> {
    if sig.signature.media_type != MEDIA_TYPE_PEM {
        return Err(Error::KeyNotFound {
            kind: "public",
            name: sig.name.clone(),
        });
    }
    let chain =
        pem_util::certificate_chain(&sig.signature.value).map_err(Error::Crypto)?;
    if chain.is_empty() {
        return Err(Error::KeyNotFound {
            kind: "public",
            name: sig.name.clone(),
        });
    }

    // validate at the attested signing time when a timestamp is present
    let at = match sig.timestamp.as_ref().and_then(|t| t.time.as_ref()) {
        Some(t) => u64::try_from(t.timestamp()).map_err(|_| Error::CertificateInvalid {
            name: sig.name.clone(),
            reason: format!("timestamp {t} predates the unix epoch"),
        })?,
        None => u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0),
    };

    verify_certificate_chain(&chain, &opts.root_certs, at).map_err(|e| {
        Error::CertificateInvalid {
            name: sig.name.clone(),
            reason: e.to_string(),
        }
    })?;

    let info = CertificateInfo::from_der(&chain[0]).map_err(|e| Error::CertificateInvalid {
        name: sig.name.clone(),
        reason: e.to_string(),
    })?;
    if let Some(expected) = &opts.issuer {
        if !match_distinguished_name(expected, &info.subject) {
            return Err(Error::CertificateInvalid {
                name: sig.name.clone(),
                reason: format!(
                    "certificate subject {} does not match expected issuer {expected}",
                    info.subject
                ),
            });
        }
    }
    Ok(info.public_key)
}
