//! Client for RFC 3161 timestamp authorities

use crate::asn1::{AlgorithmIdentifier, MessageImprint, TimeStampReq, TimeStampResp};
use crate::error::{Error, Result};
use crate::token::TimestampToken;

/// A client for a Time-Stamp Authority.
pub struct TimestampClient {
    url: String,
    http: reqwest::blocking::Client,
}

impl TimestampClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    /// Request a timestamp over a message digest.
    ///
    /// `algorithm` names the hash algorithm the digest was produced with.
    /// Returns the granted token, which embeds the authority's genTime.
    pub fn timestamp(&self, digest: &[u8], algorithm: AlgorithmIdentifier) -> Result<TimestampToken> {
        let imprint = MessageImprint::new(algorithm, digest.to_vec())?;
        let request_der = TimeStampReq::new(imprint)?.to_der()?;

        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/timestamp-query")
            .body(request_der)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "authority returned status {}",
                response.status()
            )));
        }
        let response_bytes = response
            .bytes()
            .map_err(|e| Error::Http(e.to_string()))?
            .to_vec();

        let tsr = TimeStampResp::from_der_bytes(&response_bytes)?;
        if !tsr.is_success() {
            return Err(Error::InvalidResponse(format!(
                "request not granted, status {}",
                tsr.status.status
            )));
        }
        TimestampToken::from_response_der(response_bytes)
    }
}
