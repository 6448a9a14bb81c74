//! Signature metadata
//!
//! A descriptor may carry multiple signatures under distinct names, each
//! recording the digest it was computed over and the raw signature value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::DigestSpec;

/// Signature algorithm name for RSASSA-PKCS1-V1_5.
pub const RSA_PKCS1_V15: &str = "RSASSA-PKCS1-V1_5";

/// Media type for a raw hex-encoded RSA signature value.
pub const MEDIA_TYPE_RSA_SIGNATURE: &str = "application/vnd.ocm.signature.rsa";
/// Media type for a PEM-encoded signature value, optionally bundling
/// trailing certificate blocks for self-contained verification.
pub const MEDIA_TYPE_PEM: &str = "application/x-pem-file";

/// PEM block type holding signature bytes.
pub const SIGNATURE_PEM_BLOCK_TYPE: &str = "SIGNATURE";
/// PEM header naming the signature algorithm.
pub const SIGNATURE_ALGORITHM_HEADER: &str = "Signature Algorithm";

/// A named signature over a descriptor digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub digest: DigestSpec,
    pub signature: SignatureSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TimestampSpec>,
}

/// The signature value itself plus the algorithm and encoding used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub algorithm: String,
    pub value: String,
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
}

/// An RFC 3161 timestamp attached to a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampSpec {
    /// PEM-encoded timestamp token.
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_omitted_when_empty() {
        let sig = Signature {
            name: "s".into(),
            digest: DigestSpec::default(),
            signature: SignatureSpec {
                algorithm: RSA_PKCS1_V15.into(),
                value: "00".into(),
                media_type: MEDIA_TYPE_RSA_SIGNATURE.into(),
                issuer: String::new(),
            },
            timestamp: None,
        };
        let json = serde_json::to_string(&sig).unwrap();
        assert!(!json.contains("issuer"));
        assert!(!json.contains("timestamp"));
    }
}
