//! In-memory component repository for engine tests.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cdsig::{ComponentVersionAccess, ComponentVersionResolver, Error};
use cdsig_crypto::{KeyRegistry, PrivateKey, PublicKey};
use cdsig_digest::{BlobInfo, BlobResolver, OciClient};
use cdsig_types::{
    AccessSpec, CancelToken, ComponentDescriptor, ComponentReference, NameVersion, Resource,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa::RsaPrivateKey;

pub struct MemoryRepo {
    descriptors: Mutex<BTreeMap<NameVersion, ComponentDescriptor>>,
    blobs: BTreeMap<String, Vec<u8>>,
    pub lookups: AtomicUsize,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self {
            descriptors: Mutex::new(BTreeMap::new()),
            blobs: BTreeMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn insert(&mut self, cd: ComponentDescriptor) {
        self.descriptors
            .get_mut()
            .unwrap()
            .insert(cd.name_version(), cd);
    }

    pub fn add_blob(&mut self, digest: impl Into<String>, content: Vec<u8>) {
        self.blobs.insert(digest.into(), content);
    }

    /// The currently stored descriptor, reflecting any write-backs.
    pub fn descriptor(&self, name: &str, version: &str) -> ComponentDescriptor {
        self.descriptors
            .lock()
            .unwrap()
            .get(&NameVersion::new(name, version))
            .cloned()
            .unwrap()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ComponentVersionResolver for MemoryRepo {
    fn lookup(
        &self,
        name: &str,
        version: &str,
    ) -> cdsig::Result<Box<dyn ComponentVersionAccess + '_>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let key = NameVersion::new(name, version);
        let descriptor = self
            .descriptors
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::ResolutionFailed {
                component: key,
                reason: "not in repository".to_string(),
            })?;
        Ok(Box::new(MemoryAccess {
            repo: self,
            blobs: MemoryBlobs { repo: self },
            descriptor,
        }))
    }
}

struct MemoryAccess<'a> {
    repo: &'a MemoryRepo,
    blobs: MemoryBlobs<'a>,
    descriptor: ComponentDescriptor,
}

impl ComponentVersionAccess for MemoryAccess<'_> {
    fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    fn blob_resolver(&self) -> &dyn BlobResolver {
        &self.blobs
    }

    fn update(&mut self, descriptor: &ComponentDescriptor) -> cdsig::Result<()> {
        self.repo
            .descriptors
            .lock()
            .unwrap()
            .insert(descriptor.name_version(), descriptor.clone());
        self.descriptor = descriptor.clone();
        Ok(())
    }
}

struct MemoryBlobs<'a> {
    repo: &'a MemoryRepo,
}

impl MemoryBlobs<'_> {
    fn content(&self, resource: &Resource) -> cdsig_digest::Result<Vec<u8>> {
        let Some(AccessSpec::LocalOciBlob { digest }) = &resource.access else {
            return Err(cdsig_digest::Error::Blob(format!(
                "resource {} is not blob-backed",
                resource.name
            )));
        };
        self.repo
            .blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| cdsig_digest::Error::Blob(format!("unknown blob {digest}")))
    }
}

impl BlobResolver for MemoryBlobs<'_> {
    fn info(&self, resource: &Resource, _cancel: &CancelToken) -> cdsig_digest::Result<BlobInfo> {
        let content = self.content(resource)?;
        Ok(BlobInfo {
            media_type: "application/octet-stream".to_string(),
            digest: String::new(),
            size: content.len() as u64,
        })
    }

    fn resolve(
        &self,
        resource: &Resource,
        out: &mut dyn Write,
        cancel: &CancelToken,
    ) -> cdsig_digest::Result<BlobInfo> {
        out.write_all(&self.content(resource)?)?;
        self.info(resource, cancel)
    }
}

/// OCI client serving fixed manifest bytes per image reference.
pub struct MapOci {
    manifests: BTreeMap<String, Vec<u8>>,
}

impl MapOci {
    pub fn new() -> Self {
        Self {
            manifests: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, image_reference: impl Into<String>, manifest: Vec<u8>) {
        self.manifests.insert(image_reference.into(), manifest);
    }
}

impl OciClient for MapOci {
    fn raw_manifest(
        &self,
        image_reference: &str,
        _cancel: &CancelToken,
    ) -> cdsig_digest::Result<Vec<u8>> {
        self.manifests
            .get(image_reference)
            .cloned()
            .ok_or_else(|| cdsig_digest::Error::Oci(format!("unknown image {image_reference}")))
    }
}

pub fn key_pair(seed: u64) -> (PrivateKey, PublicKey) {
    let mut rng = StdRng::seed_from_u64(seed);
    let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
    let public = PublicKey::Rsa(key.to_public_key());
    (PrivateKey::Rsa(Box::new(key)), public)
}

pub fn keys_for(name: &str, private: PrivateKey, public: PublicKey) -> KeyRegistry {
    let mut keys = KeyRegistry::new();
    keys.add_private_key(name, private);
    keys.add_public_key(name, public);
    keys
}

pub fn blob_resource(name: &str, blob_digest: &str) -> Resource {
    Resource {
        name: name.to_string(),
        version: "1.0.0".to_string(),
        resource_type: "blob".to_string(),
        relation: "local".to_string(),
        extra_identity: Default::default(),
        access: Some(AccessSpec::LocalOciBlob {
            digest: blob_digest.to_string(),
        }),
        digest: None,
    }
}

pub fn reference(name: &str, component_name: &str, version: &str) -> ComponentReference {
    ComponentReference {
        name: name.to_string(),
        component_name: component_name.to_string(),
        version: version.to_string(),
        extra_identity: Default::default(),
        digest: None,
    }
}
