//! Component version resolution
//!
//! The engine walks the reference graph through a
//! [`ComponentVersionResolver`]; each resolved version hands out its
//! descriptor, blob access for digesting, and accepts the updated
//! descriptor when the walk writes digests or signatures back.

use cdsig_digest::BlobResolver;
use cdsig_types::{ComponentDescriptor, NameVersion};

use crate::error::Result;

/// Access to one resolved component version.
pub trait ComponentVersionAccess {
    /// The stored descriptor.
    fn descriptor(&self) -> &ComponentDescriptor;

    /// Blob access for the resources of this component version.
    fn blob_resolver(&self) -> &dyn BlobResolver;

    /// Persist an updated descriptor for this component version.
    fn update(&mut self, descriptor: &ComponentDescriptor) -> Result<()>;
}

/// Resolves component versions by name and version.
pub trait ComponentVersionResolver {
    fn lookup(&self, name: &str, version: &str) -> Result<Box<dyn ComponentVersionAccess + '_>>;
}

/// Convenience for error construction.
pub(crate) fn key_of(cv: &dyn ComponentVersionAccess) -> NameVersion {
    cv.descriptor().name_version()
}
