//! ASN.1 types for RFC 3161 Time-Stamp Protocol

use const_oid::ObjectIdentifier;
use der::asn1::{BitString, GeneralizedTime, Int, OctetString};
use der::{Decode, Encode, Sequence, ValueOrd};
use rand::Rng;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::Extensions;

use crate::error::{Error, Result};

/// OID for SHA-256: 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_256;

/// OID for SHA-512: 2.16.840.1.101.3.4.2.3
pub const OID_SHA512: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_512;

/// OID for id-ct-TSTInfo: 1.2.840.113549.1.9.16.1.4
pub const OID_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

/// Random nonce bytes encoded as a positive DER INTEGER.
///
/// A leading zero byte is prepended when the high bit is set, so the
/// value is never interpreted as negative.
fn positive_nonce_bytes() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let raw: [u8; 8] = rng.gen();
    if raw[0] & 0x80 != 0 {
        let mut padded = vec![0x00];
        padded.extend_from_slice(&raw);
        padded
    } else {
        raw.to_vec()
    }
}

/// Algorithm identifier with optional parameters
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct AlgorithmIdentifier {
    pub algorithm: ObjectIdentifier,
    #[asn1(optional = "true")]
    pub parameters: Option<der::Any>,
}

impl AlgorithmIdentifier {
    pub fn sha256() -> Self {
        Self {
            algorithm: OID_SHA256,
            parameters: None,
        }
    }

    pub fn sha512() -> Self {
        Self {
            algorithm: OID_SHA512,
            parameters: None,
        }
    }

    /// Map a hash algorithm name (`sha256`, `sha512`) to its identifier.
    pub fn for_hash_algorithm(name: &str) -> Result<Self> {
        match name {
            "sha256" => Ok(Self::sha256()),
            "sha512" => Ok(Self::sha512()),
            other => Err(Error::Asn1(format!("unsupported hash algorithm: {other}"))),
        }
    }
}

/// Message imprint: hash algorithm plus hashed message.
/// RFC 3161 Section 2.4.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    pub hash_algorithm: AlgorithmIdentifier,
    pub hashed_message: OctetString,
}

impl MessageImprint {
    pub fn new(algorithm: AlgorithmIdentifier, digest: Vec<u8>) -> Result<Self> {
        Ok(Self {
            hash_algorithm: algorithm,
            hashed_message: OctetString::new(digest).map_err(|e| Error::Asn1(e.to_string()))?,
        })
    }
}

/// Time-stamp request
/// RFC 3161 Section 2.4.1
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampReq {
    /// Version (must be 1)
    pub version: u8,
    pub message_imprint: MessageImprint,
    #[asn1(optional = "true")]
    pub req_policy: Option<ObjectIdentifier>,
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    /// Whether the authority should include its certificates
    #[asn1(default = "default_false")]
    pub cert_req: bool,
    // Extensions omitted
}

fn default_false() -> bool {
    false
}

impl TimeStampReq {
    /// A request with a fresh random nonce, asking for certificates.
    pub fn new(message_imprint: MessageImprint) -> Result<Self> {
        let nonce = Int::new(&positive_nonce_bytes()).map_err(|e| Error::Asn1(e.to_string()))?;
        Ok(Self {
            version: 1,
            message_imprint,
            req_policy: None,
            nonce: Some(nonce),
            cert_req: true,
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Encode::to_der(self).map_err(|e| Error::Asn1(format!("failed to encode request: {e}")))
    }
}

/// PKI status info
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiStatusInfo {
    /// 0 = granted, 1 = granted with modifications
    pub status: u8,
    #[asn1(optional = "true")]
    pub fail_info: Option<BitString>,
}

impl PkiStatusInfo {
    pub fn is_success(&self) -> bool {
        self.status <= 1
    }
}

/// Time-stamp response
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampResp {
    pub status: PkiStatusInfo,
    /// CMS ContentInfo carrying the token
    #[asn1(optional = "true")]
    pub time_stamp_token: Option<der::Any>,
}

impl TimeStampResp {
    pub fn from_der_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_der(bytes).map_err(|e| Error::Asn1(format!("failed to decode response: {e}")))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.time_stamp_token.is_some()
    }
}

/// Accuracy of the timestamp
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Accuracy {
    #[asn1(optional = "true")]
    pub seconds: Option<u64>,
    #[asn1(context_specific = "0", optional = "true")]
    pub millis: Option<u16>,
    #[asn1(context_specific = "1", optional = "true")]
    pub micros: Option<u16>,
}

/// TSTInfo, the signed timestamp statement
/// RFC 3161 Section 2.4.2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TstInfo {
    /// Version (must be 1)
    pub version: u8,
    pub policy: ObjectIdentifier,
    pub message_imprint: MessageImprint,
    pub serial_number: Int,
    pub gen_time: GeneralizedTime,
    #[asn1(optional = "true")]
    pub accuracy: Option<Accuracy>,
    #[asn1(default = "default_false")]
    pub ordering: bool,
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub tsa: Option<GeneralName>,
    #[asn1(context_specific = "1", optional = "true", tag_mode = "IMPLICIT")]
    pub extensions: Option<Extensions>,
}

impl TstInfo {
    pub fn from_der_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_der(bytes).map_err(|e| Error::Parse(format!("invalid TSTInfo: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encodes_with_nonce_and_cert_req() {
        let imprint = MessageImprint::new(AlgorithmIdentifier::sha256(), vec![0u8; 32]).unwrap();
        let req = TimeStampReq::new(imprint).unwrap();
        assert!(req.nonce.is_some());
        assert!(req.cert_req);
        assert!(!req.to_der().unwrap().is_empty());
    }

    #[test]
    fn nonce_bytes_are_positive_integers() {
        for _ in 0..100 {
            let bytes = positive_nonce_bytes();
            assert!(bytes.len() == 8 || bytes.len() == 9);
            assert_eq!(bytes[0] & 0x80, 0);
            assert!(Int::new(&bytes).is_ok());
        }
    }

    #[test]
    fn unknown_hash_algorithm_is_rejected() {
        assert!(AlgorithmIdentifier::for_hash_algorithm("md5").is_err());
        assert!(AlgorithmIdentifier::for_hash_algorithm("sha512").is_ok());
    }

    // digestAlgorithms in SignedData is a SET OF, which needs a DER
    // value ordering on its element type
    #[test]
    fn algorithm_identifiers_can_populate_der_sets() {
        let mut set: der::asn1::SetOfVec<AlgorithmIdentifier> = der::asn1::SetOfVec::new();
        set.insert(AlgorithmIdentifier::sha512()).unwrap();
        set.insert(AlgorithmIdentifier::sha256()).unwrap();
        assert!(!set.to_der().unwrap().is_empty());
    }

    #[test]
    fn status_above_one_is_failure() {
        let rejected = PkiStatusInfo {
            status: 2,
            fail_info: None,
        };
        assert!(!rejected.is_success());
    }
}
