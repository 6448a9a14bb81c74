//! Timestamp token handling
//!
//! A granted response embeds the signed `TSTInfo` inside a CMS
//! `SignedData` structure. Descriptors store the whole response as a PEM
//! block next to the signature, together with the extracted genTime.

use chrono::{DateTime, Utc};
use der::{Header, Reader, SliceReader};
use pem::Pem;

use crate::asn1::TstInfo;
use crate::error::{Error, Result};

/// PEM block type for a stored timestamp token.
pub const TIMESTAMP_PEM_BLOCK_TYPE: &str = "TIMESTAMP TOKEN";

/// A timestamp token as returned by an authority.
#[derive(Debug, Clone)]
pub struct TimestampToken {
    /// The full DER-encoded `TimeStampResp`.
    der: Vec<u8>,
    tst_info: TstInfo,
}

impl TimestampToken {
    /// Parse a DER-encoded `TimeStampResp` and extract its `TSTInfo`.
    pub fn from_response_der(der: Vec<u8>) -> Result<Self> {
        let tst_info = extract_tst_info(&der)?;
        Ok(Self { der, tst_info })
    }

    /// Parse a PEM-encoded token as stored in a descriptor signature.
    pub fn from_pem(pem_data: &str) -> Result<Self> {
        let block = pem::parse(pem_data).map_err(|e| Error::Pem(e.to_string()))?;
        if block.tag() != TIMESTAMP_PEM_BLOCK_TYPE {
            return Err(Error::Pem(format!("unexpected PEM tag {}", block.tag())));
        }
        Self::from_response_der(block.into_contents())
    }

    /// The token encoded for storage in a descriptor signature.
    pub fn to_pem(&self) -> String {
        pem::encode(&Pem::new(TIMESTAMP_PEM_BLOCK_TYPE, self.der.clone()))
    }

    pub fn tst_info(&self) -> &TstInfo {
        &self.tst_info
    }

    /// The genTime the authority attested.
    pub fn gen_time(&self) -> Option<DateTime<Utc>> {
        let secs = self.tst_info.gen_time.to_unix_duration().as_secs();
        DateTime::from_timestamp(secs as i64, 0)
    }
}

/// Walk the CMS wrapping down to the `TSTInfo` content.
///
/// ```text
/// TimeStampResp -> ContentInfo -> SignedData
///   -> EncapsulatedContentInfo -> eContent OCTET STRING -> TSTInfo
/// ```
fn extract_tst_info(response_der: &[u8]) -> Result<TstInfo> {
    let mut reader =
        SliceReader::new(response_der).map_err(|e| Error::Parse(e.to_string()))?;

    enter(&mut reader, "TimeStampResp")?;
    skip(&mut reader, "PKIStatusInfo")?;
    enter(&mut reader, "ContentInfo")?;
    skip(&mut reader, "contentType")?;
    enter(&mut reader, "content [0]")?;
    enter(&mut reader, "SignedData")?;
    skip(&mut reader, "version")?;
    skip(&mut reader, "digestAlgorithms")?;
    enter(&mut reader, "EncapsulatedContentInfo")?;
    skip(&mut reader, "eContentType")?;
    enter(&mut reader, "eContent [0]")?;

    let header = decode_header(&mut reader, "eContent OCTET STRING")?;
    let content = reader
        .read_slice(header.length)
        .map_err(|e| Error::Parse(format!("truncated eContent: {e}")))?;
    TstInfo::from_der_bytes(content)
}

fn decode_header(reader: &mut SliceReader<'_>, what: &str) -> Result<Header> {
    use der::Decode;
    Header::decode(reader).map_err(|e| Error::Parse(format!("failed to decode {what}: {e}")))
}

/// Decode a constructed value's header, leaving the reader inside it.
fn enter(reader: &mut SliceReader<'_>, what: &str) -> Result<()> {
    decode_header(reader, what).map(|_| ())
}

/// Decode a value's header and skip over its content.
fn skip(reader: &mut SliceReader<'_>, what: &str) -> Result<()> {
    let header = decode_header(reader, what)?;
    reader
        .read_slice(header.length)
        .map_err(|e| Error::Parse(format!("failed to skip {what}: {e}")))?;
    Ok(())
}
