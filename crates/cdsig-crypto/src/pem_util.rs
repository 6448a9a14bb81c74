//! PEM helpers for signature values
//!
//! A PEM-encoded signature value holds exactly one `SIGNATURE` block, with
//! the algorithm recorded in a `Signature Algorithm` header, optionally
//! followed by `CERTIFICATE` blocks carrying the signing chain.

use cdsig_types::{SIGNATURE_ALGORITHM_HEADER, SIGNATURE_PEM_BLOCK_TYPE};
use pem::Pem;

use crate::error::{Error, Result};

const CERTIFICATE_BLOCK_TYPE: &str = "CERTIFICATE";

/// Encode signature bytes as a `SIGNATURE` PEM block with the algorithm
/// header set.
pub fn encode_signature(signature: &[u8], algorithm: &str) -> Result<String> {
    let mut block = Pem::new(SIGNATURE_PEM_BLOCK_TYPE, signature);
    block
        .headers_mut()
        .add(SIGNATURE_ALGORITHM_HEADER, algorithm)
        .map_err(|e| Error::Pem(e.to_string()))?;
    Ok(pem::encode(&block))
}

/// Extract the signature bytes and declared algorithm from a PEM document.
///
/// The document must contain exactly one `SIGNATURE` block; any number of
/// other blocks may follow it.
pub fn decode_signature(pem_data: &str) -> Result<(Vec<u8>, Option<String>)> {
    let blocks = parse(pem_data)?;
    let mut signatures = blocks
        .into_iter()
        .filter(|b| b.tag() == SIGNATURE_PEM_BLOCK_TYPE);
    let block = signatures
        .next()
        .ok_or_else(|| Error::Pem("no SIGNATURE block found".to_string()))?;
    if signatures.next().is_some() {
        return Err(Error::Pem("more than one SIGNATURE block found".to_string()));
    }
    let algorithm = block
        .headers()
        .get(SIGNATURE_ALGORITHM_HEADER)
        .map(str::to_string);
    Ok((block.into_contents(), algorithm))
}

/// Extract the DER bytes of all `CERTIFICATE` blocks, in document order.
///
/// The first certificate is expected to be the signing (end-entity)
/// certificate, followed by intermediates and optionally the root.
pub fn certificate_chain(pem_data: &str) -> Result<Vec<Vec<u8>>> {
    Ok(parse(pem_data)?
        .into_iter()
        .filter(|b| b.tag() == CERTIFICATE_BLOCK_TYPE)
        .map(Pem::into_contents)
        .collect())
}

/// Append PEM-encoded certificates to an existing PEM document.
pub fn append_certificates(pem_data: &str, cert_ders: &[Vec<u8>]) -> String {
    let mut out = pem_data.to_string();
    for der in cert_ders {
        out.push_str(&pem::encode(&Pem::new(CERTIFICATE_BLOCK_TYPE, der.clone())));
    }
    out
}

fn parse(pem_data: &str) -> Result<Vec<Pem>> {
    pem::parse_many(pem_data).map_err(|e| Error::Pem(e.to_string()))
}
