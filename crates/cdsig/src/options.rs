//! Walk options
//!
//! One `Options` value configures a whole signing or verification walk.
//! Nested component versions get derived option sets: recursion without
//! the recursive flag drops the signer, re-signing in a private context
//! drops recursion and updates.

use std::collections::BTreeSet;
use std::sync::Arc;

use cdsig_crypto::{HandlerRegistry, KeyRegistry, RsaSigner, Signer, SHA256};
use cdsig_digest::OciClient;
use cdsig_types::{CancelToken, NameVersion};

use crate::error::{Error, Result};

/// Where reference digests are persisted.
///
/// `Local` stores each reference's digest on the reference itself;
/// `Top` collapses the digests of the whole closure into the signed
/// root's `nestedDigests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestMode {
    #[default]
    Local,
    Top,
}

/// Placeholder OCI client used when none is configured.
struct NoOciClient;

impl OciClient for NoOciClient {
    fn raw_manifest(
        &self,
        image_reference: &str,
        _cancel: &CancelToken,
    ) -> cdsig_digest::Result<Vec<u8>> {
        Err(cdsig_digest::Error::Oci(format!(
            "no OCI client configured, cannot resolve {image_reference}"
        )))
    }
}

/// Configuration for one signing / verification walk.
#[derive(Clone)]
pub struct Options {
    pub(crate) verify: bool,
    pub(crate) signer: Option<Arc<dyn Signer>>,
    pub(crate) signature_name: Option<String>,
    /// Effective signature names for verification, determined per root.
    pub(crate) signature_names: Vec<String>,
    pub(crate) hash_algorithm: String,
    pub(crate) digest_mode: DigestMode,
    pub(crate) recursive: bool,
    pub(crate) update: bool,
    pub(crate) skip_access_types: BTreeSet<String>,
    pub(crate) issuer: Option<String>,
    pub(crate) tsa_url: Option<String>,
    pub(crate) root_certs: Vec<Vec<u8>>,
    pub(crate) registry: Arc<HandlerRegistry>,
    pub(crate) keys: KeyRegistry,
    pub(crate) oci: Arc<dyn OciClient>,
    pub(crate) cancel: CancelToken,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    pub fn new() -> Self {
        Self {
            verify: false,
            signer: None,
            signature_name: None,
            signature_names: Vec::new(),
            hash_algorithm: SHA256.to_string(),
            digest_mode: DigestMode::default(),
            recursive: false,
            update: false,
            skip_access_types: BTreeSet::new(),
            issuer: None,
            tsa_url: None,
            root_certs: Vec::new(),
            registry: Arc::new(HandlerRegistry::default()),
            keys: KeyRegistry::new(),
            oci: Arc::new(NoOciClient),
            cancel: CancelToken::new(),
        }
    }

    /// Sign with the default RSASSA-PKCS1-V1_5 signer under this name.
    pub fn sign(mut self, signature_name: impl Into<String>) -> Self {
        self.signature_name = Some(signature_name.into());
        if self.signer.is_none() {
            self.signer = Some(Arc::new(RsaSigner::raw()));
        }
        self
    }

    /// Use a specific signer implementation.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Verify signatures during the walk.
    pub fn verify(mut self) -> Self {
        self.verify = true;
        self
    }

    /// Restrict verification to a single signature name.
    pub fn with_signature_name(mut self, name: impl Into<String>) -> Self {
        self.signature_name = Some(name.into());
        self
    }

    pub fn with_hash_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.hash_algorithm = algorithm.into();
        self
    }

    pub fn with_digest_mode(mut self, mode: DigestMode) -> Self {
        self.digest_mode = mode;
        self
    }

    /// Recursively sign referenced component versions as well.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Write calculated digests and signatures back through the
    /// resolver. Signing always updates.
    pub fn update(mut self) -> Self {
        self.update = true;
        self
    }

    /// Assign the exclusion sentinel to undigested resources of these
    /// access kinds instead of digesting them.
    pub fn skip_access_type(mut self, kind: impl Into<String>) -> Self {
        self.skip_access_types.insert(kind.into());
        self
    }

    /// Expected issuer distinguished name for signatures.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Attach an RFC 3161 timestamp from this authority when signing.
    pub fn with_tsa_url(mut self, url: impl Into<String>) -> Self {
        self.tsa_url = Some(url.into());
        self
    }

    /// Trusted root certificates (DER) for signature certificate chains.
    pub fn with_root_certificate(mut self, der: Vec<u8>) -> Self {
        self.root_certs.push(der);
        self
    }

    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_keys(mut self, keys: KeyRegistry) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_oci_client(mut self, oci: Arc<dyn OciClient>) -> Self {
        self.oci = oci;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn do_sign(&self) -> bool {
        self.signer.is_some() && self.signature_name.is_some()
    }

    pub(crate) fn do_verify(&self) -> bool {
        self.verify
    }

    pub(crate) fn do_update(&self) -> bool {
        self.update || self.do_sign()
    }

    pub(crate) fn store_locally(&self) -> bool {
        self.digest_mode == DigestMode::Local
    }

    pub(crate) fn signature_name(&self) -> Result<&str> {
        self.signature_name
            .as_deref()
            .ok_or_else(|| Error::InvalidOptions("no signature name configured".to_string()))
    }

    pub(crate) fn check_cancelled(&self, at: &NameVersion) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                component: at.clone(),
            });
        }
        Ok(())
    }

    /// Options for descending into a component reference.
    pub(crate) fn nested(&self) -> Self {
        let mut opts = self.clone();
        opts.verify = false;
        if !opts.recursive {
            opts.update = opts.do_update() && opts.digest_mode == DigestMode::Local;
            opts.signer = None;
        }
        opts
    }

    /// Options for continuing in the outer context after a version was
    /// re-signed in its own private context.
    pub(crate) fn stop_recursion(&self) -> Self {
        let mut opts = self.clone();
        opts.recursive = false;
        opts.signer = None;
        opts.update = false;
        opts
    }
}
