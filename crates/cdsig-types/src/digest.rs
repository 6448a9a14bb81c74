//! Digest metadata
//!
//! A `DigestSpec` records which hash algorithm and which normalization
//! algorithm produced a digest value. Equality is structural over all
//! three fields; producer and verifier must agree on both algorithms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::{ExtraIdentity, NameVersion, Resource};

/// Normalization algorithm for descriptor hashing.
pub const JSON_NORMALISATION_V1: &str = "jsonNormalisation/v1";
/// Digest over the raw OCI manifest bytes of a resource.
pub const OCI_ARTIFACT_DIGEST_V1: &str = "ociArtifactDigest/v1";
/// Digest over an opaque blob stream.
pub const GENERIC_BLOB_DIGEST_V1: &str = "genericBlobDigest/v1";

/// Sentinel normalisation algorithm marking a resource as excluded from
/// signing (used together with [`NO_DIGEST`]).
pub const EXCLUDE_FROM_SIGNATURE: &str = "EXCLUDE-FROM-SIGNATURE";
/// Sentinel hash algorithm and value for excluded resources.
pub const NO_DIGEST: &str = "NO-DIGEST";

/// {hash algorithm, normalization algorithm, lowercase hex value}.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DigestSpec {
    #[serde(rename = "hashAlgorithm")]
    pub hash_algorithm: String,
    #[serde(rename = "normalisationAlgorithm")]
    pub normalisation_algorithm: String,
    pub value: String,
}

impl DigestSpec {
    pub fn new(
        hash_algorithm: impl Into<String>,
        normalisation_algorithm: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            hash_algorithm: hash_algorithm.into(),
            normalisation_algorithm: normalisation_algorithm.into(),
            value: value.into(),
        }
    }

    /// The reserved digest marking a resource as not subject to signing.
    /// This is a dedicated sentinel, distinct from any real hash; it is
    /// passed through untouched by digest calculation.
    pub fn exclude_from_signature() -> Self {
        Self {
            hash_algorithm: NO_DIGEST.to_string(),
            normalisation_algorithm: EXCLUDE_FROM_SIGNATURE.to_string(),
            value: NO_DIGEST.to_string(),
        }
    }

    pub fn is_excluded(&self) -> bool {
        *self == Self::exclude_from_signature()
    }

    /// All three fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.hash_algorithm.is_empty()
            && !self.normalisation_algorithm.is_empty()
            && !self.value.is_empty()
    }
}

impl fmt::Display for DigestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{}]",
            self.hash_algorithm, self.value, self.normalisation_algorithm
        )
    }
}

/// The algorithm pair of a digest, without the value. Used to decide
/// whether two digests are comparable at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DigesterType {
    pub hash_algorithm: String,
    pub normalisation_algorithm: String,
}

impl DigesterType {
    pub fn of(digest: Option<&DigestSpec>) -> Self {
        match digest {
            Some(d) => Self {
                hash_algorithm: d.hash_algorithm.clone(),
                normalisation_algorithm: d.normalisation_algorithm.clone(),
            },
            None => Self::default(),
        }
    }

    pub fn is_initial(&self) -> bool {
        self.hash_algorithm.is_empty() && self.normalisation_algorithm.is_empty()
    }
}

impl fmt::Display for DigesterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hash_algorithm, self.normalisation_algorithm)
    }
}

/// Digest of a single resource, with enough identity to locate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub name: String,
    pub version: String,
    #[serde(
        default,
        rename = "extraIdentity",
        skip_serializing_if = "ExtraIdentity::is_empty"
    )]
    pub extra_identity: ExtraIdentity,
    pub digest: DigestSpec,
}

impl ArtifactDigest {
    /// Capture the digest of a resource. The resource must carry one.
    pub fn of_resource(resource: &Resource) -> Option<Self> {
        resource.digest.as_ref().map(|d| Self {
            name: resource.name.clone(),
            version: resource.version.clone(),
            extra_identity: resource.extra_identity.clone(),
            digest: d.clone(),
        })
    }

    fn matches_identity(&self, name: &str, version: &str, extra: &ExtraIdentity) -> bool {
        self.name == name && self.version == version && self.extra_identity == *extra
    }
}

/// Aggregated resource digests for one referenced component version,
/// persisted under `nestedDigests` when digests are collapsed at the
/// signed root instead of being stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedComponentDigests {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ArtifactDigest>,
}

impl NestedComponentDigests {
    pub fn name_version(&self) -> NameVersion {
        NameVersion::new(&self.name, &self.version)
    }

    /// Find the digest recorded for a resource identity.
    pub fn lookup(
        &self,
        name: &str,
        version: &str,
        extra: &ExtraIdentity,
    ) -> Option<&ArtifactDigest> {
        self.resources
            .iter()
            .find(|a| a.matches_identity(name, version, extra))
    }

    /// Set equality over the recorded resource digests. Order is not
    /// significant; identity plus digest value must agree.
    pub fn resources_match(&self, other: &[ArtifactDigest]) -> bool {
        if self.resources.len() != other.len() {
            return false;
        }
        self.resources.iter().all(|a| {
            other
                .iter()
                .any(|b| a.matches_identity(&b.name, &b.version, &b.extra_identity) && a.digest == b.digest)
        })
    }
}
