//! Collaborator traits for resource content access
//!
//! The digester never speaks registry protocols itself; callers inject an
//! [`OciClient`] for manifest access and receive a [`BlobResolver`] per
//! component version from their repository implementation.

use std::io::Write;

use cdsig_types::{CancelToken, Resource};

use crate::error::Result;

/// Descriptive metadata for a resolved blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub media_type: String,
    /// Repository-native digest of the blob, e.g. `sha256:...`.
    pub digest: String,
    pub size: u64,
}

/// Read access to OCI manifests.
pub trait OciClient: Send + Sync {
    /// Fetch the raw, unmodified manifest bytes for an image reference.
    ///
    /// The bytes must be returned exactly as served; the artifact digest
    /// is computed over them.
    fn raw_manifest(&self, image_reference: &str, cancel: &CancelToken) -> Result<Vec<u8>>;
}

/// Read access to blobs stored alongside a component version.
pub trait BlobResolver: Send + Sync {
    /// Metadata for the blob backing `resource`.
    fn info(&self, resource: &Resource, cancel: &CancelToken) -> Result<BlobInfo>;

    /// Stream the blob backing `resource` into `out`.
    fn resolve(
        &self,
        resource: &Resource,
        out: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<BlobInfo>;
}
