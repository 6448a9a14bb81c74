//! Resource digest calculation
//!
//! Dispatches on the resource's access kind: OCI manifests are hashed as
//! served (`ociArtifactDigest/v1`), blob-backed accesses are hashed as an
//! opaque stream (`genericBlobDigest/v1`). Resources without access, and
//! resources carrying the exclusion sentinel, produce no new digest.

use std::io::{self, Write};
use std::sync::Arc;

use cdsig_crypto::Hasher;
use cdsig_types::{
    AccessSpec, CancelToken, DigestSpec, Resource, GENERIC_BLOB_DIGEST_V1, OCI_ARTIFACT_DIGEST_V1,
};
use sha2::digest::DynDigest;

use crate::error::{Error, Result};
use crate::resolver::{BlobResolver, OciClient};

/// Computes content digests for resources.
///
/// Owns a single digest instance that is reset before every computation.
pub struct ResourceDigester {
    oci: Arc<dyn OciClient>,
    hasher: Arc<dyn Hasher>,
    digest: Box<dyn DynDigest + Send>,
    http: reqwest::blocking::Client,
}

impl ResourceDigester {
    pub fn new(oci: Arc<dyn OciClient>, hasher: Arc<dyn Hasher>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder().build()?;
        let digest = hasher.create();
        Ok(Self {
            oci,
            hasher,
            digest,
            http,
        })
    }

    /// The hash algorithm digests are computed with.
    pub fn algorithm(&self) -> &'static str {
        self.hasher.algorithm()
    }

    /// Compute the digest for a resource, or `None` when it has no
    /// digestible content.
    ///
    /// A pre-existing exclusion sentinel is passed through untouched.
    pub fn digest_for_resource(
        &mut self,
        resource: &Resource,
        blobs: &dyn BlobResolver,
        cancel: &CancelToken,
    ) -> Result<Option<DigestSpec>> {
        if let Some(existing) = &resource.digest {
            if existing.is_excluded() {
                return Ok(Some(existing.clone()));
            }
        }
        let Some(access) = &resource.access else {
            return Ok(None);
        };
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match access {
            AccessSpec::None => Ok(None),
            AccessSpec::OciRegistry { image_reference } => {
                tracing::debug!(resource = %resource.name, image = %image_reference, "digesting oci manifest");
                let manifest = self.oci.raw_manifest(image_reference, cancel)?;
                self.digest.reset();
                self.digest.update(&manifest);
                Ok(Some(self.finish(OCI_ARTIFACT_DIGEST_V1)))
            }
            AccessSpec::LocalOciBlob { .. } => {
                tracing::debug!(resource = %resource.name, "digesting local blob");
                self.digest.reset();
                let mut sink = HashWriter::new(self.digest.as_mut());
                blobs.resolve(resource, &mut sink, cancel)?;
                Ok(Some(self.finish(GENERIC_BLOB_DIGEST_V1)))
            }
            AccessSpec::S3 {
                bucket_name,
                object_key,
            } => {
                let url = s3_url(bucket_name, object_key);
                tracing::debug!(resource = %resource.name, url = %url, "digesting s3 object");
                let response = self.http.get(&url).send()?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().unwrap_or_default();
                    return Err(Error::FetchFailed {
                        url,
                        status: status.as_u16(),
                        body,
                    });
                }
                self.digest.reset();
                let mut response = response;
                let mut sink = HashWriter::new(self.digest.as_mut());
                io::copy(&mut response, &mut sink)?;
                Ok(Some(self.finish(GENERIC_BLOB_DIGEST_V1)))
            }
        }
    }

    fn finish(&mut self, normalisation_algorithm: &str) -> DigestSpec {
        let value = hex::encode(self.digest.finalize_reset());
        DigestSpec::new(self.hasher.algorithm(), normalisation_algorithm, value)
    }
}

fn s3_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

/// `io::Write` adapter feeding a digest instance.
struct HashWriter<'a> {
    digest: &'a mut (dyn DynDigest + Send),
}

impl<'a> HashWriter<'a> {
    fn new(digest: &'a mut (dyn DynDigest + Send)) -> Self {
        Self { digest }
    }
}

impl Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.digest.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
