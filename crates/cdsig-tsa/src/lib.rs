//! RFC 3161 timestamping for descriptor signatures
//!
//! Submits a timestamp request for a signature digest to a Time-Stamp
//! Authority and turns the granted token into the PEM form stored in the
//! descriptor, with the attested genTime extracted for convenience.

pub mod asn1;
pub mod client;
pub mod error;
pub mod token;

pub use crate::asn1::{AlgorithmIdentifier, TimeStampReq, TimeStampResp, TstInfo};
pub use crate::client::TimestampClient;
pub use crate::error::{Error, Result};
pub use crate::token::{TimestampToken, TIMESTAMP_PEM_BLOCK_TYPE};
