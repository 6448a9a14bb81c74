//! Resource access specifications
//!
//! Access kinds form a closed enum so the resource digester can match
//! exhaustively; adding an access kind is a compile-time-checked change.

use serde::{Deserialize, Serialize};

/// How the content of a resource can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AccessSpec {
    /// An artifact stored in an OCI registry, addressed by image reference.
    #[serde(rename = "ociRegistry")]
    OciRegistry {
        #[serde(rename = "imageReference")]
        image_reference: String,
    },
    /// A blob stored next to the component descriptor, addressed by digest.
    #[serde(rename = "localOciBlob")]
    LocalOciBlob { digest: String },
    /// An object in an S3 bucket.
    #[serde(rename = "s3")]
    S3 {
        #[serde(rename = "bucketName")]
        bucket_name: String,
        #[serde(rename = "objectKey")]
        object_key: String,
    },
    /// No content. Resources with this access carry no digest.
    None,
}

impl AccessSpec {
    /// The wire name of the access kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AccessSpec::OciRegistry { .. } => "ociRegistry",
            AccessSpec::LocalOciBlob { .. } => "localOciBlob",
            AccessSpec::S3 { .. } => "s3",
            AccessSpec::None => "None",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AccessSpec::None)
    }
}
