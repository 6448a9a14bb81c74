//! X.509 certificate handling
//!
//! Signatures may carry their signing certificate chain inline. Before the
//! embedded public key is trusted, the chain is validated against caller
//! supplied root certificates and the leaf's issuer is matched against the
//! issuer recorded in the signature.

use const_oid::db::rfc5912::ID_KP_CODE_SIGNING;
use rustls_pki_types::{CertificateDer, UnixTime};
use webpki::{anchor_from_trusted_cert, EndEntityCert, KeyUsage, ALL_VERIFICATION_ALGS};
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

use crate::error::{Error, Result};
use crate::keys::PublicKey;

/// Fields extracted from a parsed certificate.
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// Subject distinguished name in RFC 4514 form.
    pub subject: String,
    /// Issuer distinguished name in RFC 4514 form.
    pub issuer: String,
    /// Validity bounds as Unix seconds.
    pub not_before: u64,
    pub not_after: u64,
    /// The subject public key.
    pub public_key: PublicKey,
}

impl CertificateInfo {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("DER parse failed: {e}")))?;
        let tbs = &cert.tbs_certificate;
        let spki = tbs
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Certificate(format!("SPKI encode failed: {e}")))?;
        Ok(Self {
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            not_before: tbs.validity.not_before.to_unix_duration().as_secs(),
            not_after: tbs.validity.not_after.to_unix_duration().as_secs(),
            public_key: PublicKey::from_spki_der(&spki)?,
        })
    }
}

/// Validate a certificate chain against trusted roots.
///
/// `chain` holds the end-entity certificate first, followed by any
/// intermediates. Validation requires the code-signing extended key usage
/// on the leaf and checks time validity at `at_unix_secs`.
pub fn verify_certificate_chain(
    chain: &[Vec<u8>],
    roots: &[Vec<u8>],
    at_unix_secs: u64,
) -> Result<()> {
    let (ee_der, intermediate_ders) = chain
        .split_first()
        .ok_or_else(|| Error::Certificate("empty certificate chain".to_string()))?;
    if roots.is_empty() {
        return Err(Error::Certificate("no trusted root certificates".to_string()));
    }

    let root_ders: Vec<CertificateDer<'_>> = roots
        .iter()
        .map(|der| CertificateDer::from(der.as_slice()))
        .collect();
    let trust_anchors: Vec<_> = root_ders
        .iter()
        .map(|cert| {
            anchor_from_trusted_cert(cert)
                .map_err(|e| Error::Certificate(format!("invalid root certificate: {e}")))
        })
        .collect::<Result<_>>()?;

    let intermediates: Vec<CertificateDer<'_>> = intermediate_ders
        .iter()
        .map(|der| CertificateDer::from(der.as_slice()))
        .collect();

    let ee_ref = CertificateDer::from(ee_der.as_slice());
    let end_entity = EndEntityCert::try_from(&ee_ref)
        .map_err(|e| Error::Certificate(format!("invalid end-entity certificate: {e}")))?;

    let time = UnixTime::since_unix_epoch(std::time::Duration::from_secs(at_unix_secs));
    end_entity
        .verify_for_usage(
            ALL_VERIFICATION_ALGS,
            &trust_anchors,
            &intermediates,
            time,
            KeyUsage::required(ID_KP_CODE_SIGNING.as_bytes()),
            None,
            None,
        )
        .map_err(|e| Error::Certificate(format!("chain validation failed: {e}")))?;

    tracing::debug!("certificate chain validated");
    Ok(())
}

/// Check whether `actual` satisfies the `expected` distinguished name.
///
/// Every attribute listed in `expected` must be present with the same
/// value in `actual`; `actual` may carry additional attributes.
pub fn match_distinguished_name(expected: &str, actual: &str) -> bool {
    let actual_attrs: Vec<&str> = actual.split(',').map(str::trim).collect();
    expected
        .split(',')
        .map(str::trim)
        .filter(|attr| !attr.is_empty())
        .all(|attr| actual_attrs.contains(&attr))
}
