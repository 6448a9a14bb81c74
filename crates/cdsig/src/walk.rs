//! Recursive descriptor walk
//!
//! Digesting, signing and verification share one depth-first walk over
//! the component reference graph. Every version is digested bottom-up:
//! resource digests first, then the digests of all references, then the
//! hash of the normalised descriptor carrying them. Signing and
//! verification operate on that final hash.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use cdsig_crypto::match_distinguished_name;
use cdsig_digest::ResourceDigester;
use cdsig_tsa::{AlgorithmIdentifier, TimestampClient};
use cdsig_types::{
    ComponentDescriptor, DigestSpec, DigesterType, NameVersion, Signature, TimestampSpec,
    JSON_NORMALISATION_V1, MEDIA_TYPE_PEM,
};

use crate::context::{digest_mode_of, CtxRef, WalkingState};
use crate::error::{Error, Result};
use crate::options::{DigestMode, Options};
use crate::resolver::{key_of, ComponentVersionAccess, ComponentVersionResolver};
use crate::verify::verify_signatures;

/// One walk over a reference graph. The state survives recursion so
/// shared references are digested once per compatible root.
pub(crate) struct Walker<'a> {
    resolver: &'a dyn ComponentVersionResolver,
    pub(crate) state: WalkingState,
}

impl<'a> Walker<'a> {
    pub fn new(resolver: &'a dyn ComponentVersionResolver) -> Self {
        Self {
            resolver,
            state: WalkingState::new(),
        }
    }

    /// Process one component version and return a reference to its
    /// finished digest context.
    pub fn apply(
        &mut self,
        cv: &mut dyn ComponentVersionAccess,
        opts: &Options,
        parent_root: Option<&NameVersion>,
    ) -> Result<CtxRef> {
        let nv = key_of(cv);
        opts.check_cancelled(&nv)?;

        if self.state.history.contains(&nv) {
            return Err(Error::CircularReference {
                path: format!("{} -> {}", self.state.history_string(), nv),
            });
        }
        if self.state.closure.contains_key(&nv) {
            if let Some(root) = parent_root {
                // revisit; only an unsigned context needs another pass
                // when this walk is supposed to sign
                if let Some(ctx) = self.state.lookup(&nv, root) {
                    if !opts.do_sign() || ctx.signed {
                        return Ok(CtxRef {
                            nv,
                            root: root.clone(),
                        });
                    }
                }
            }
        }

        self.state.history.push(nv.clone());
        let result = self.apply_inner(&nv, cv, opts, parent_root);
        self.state.history.pop();
        result
    }

    fn apply_inner(
        &mut self,
        nv: &NameVersion,
        cv: &mut dyn ComponentVersionAccess,
        opts: &Options,
        parent_root: Option<&NameVersion>,
    ) -> Result<CtxRef> {
        let r = match parent_root.and_then(|root| self.state.lookup(nv, root)) {
            Some(_) => CtxRef {
                nv: nv.clone(),
                root: parent_root.cloned().unwrap_or_else(|| unreachable!()),
            },
            None => self.state.create_context(cv.descriptor(), parent_root)?,
        };
        let mut opts = opts.clone();

        if self.state.ctx(&r).is_root() {
            opts.digest_mode = digest_mode_of(cv.descriptor(), opts.digest_mode);
            self.state.root_mut(&r.root).sign = opts.do_sign();
            if opts.do_sign() || !opts.do_verify() {
                self.state.root_mut(&r.root).digest_type = DigesterType {
                    hash_algorithm: opts.hash_algorithm.clone(),
                    normalisation_algorithm: JSON_NORMALISATION_V1.to_string(),
                };
                opts.signature_names = opts.signature_name.iter().cloned().collect();
            } else {
                self.determine_signature_info(&r, &mut opts)?;
            }
        }

        {
            let ctx = self.state.ctx(&r);
            if ctx.digest.is_some() && (!opts.do_sign() || ctx.signed) {
                tracing::debug!(cv = %nv, root = %r.root, source = ?ctx.source,
                    "reusing digest from previous walk");
                return Ok(r);
            }
        }

        // a version already committed to another digest mode is signed
        // in its own private context first, then adopted if compatible
        let mut privately_signed = false;
        if parent_root.is_some()
            && opts.do_sign()
            && digest_mode_of(cv.descriptor(), opts.digest_mode) != opts.digest_mode
        {
            let inner = self.apply_inner(nv, cv, &opts, None)?;
            if self.state.adopt_if_valid(&r, &inner)? {
                return Ok(r);
            }
            opts = opts.stop_recursion();
            privately_signed = true;
        }

        tracing::debug!(cv = %nv, root = %r.root, sign = opts.do_sign(),
            verify = opts.do_verify(), "processing component version");

        let mut spec = None;
        if self.state.ctx(&r).digest.is_none() {
            self.calculate_reference_digests(&r, &opts)?;
            self.calculate_resource_digests(&r, cv, &opts)?;

            let mut digest_type = self.state.root(&r.root).digest_type.clone();
            if let Some(preset_digest) = self
                .state
                .root(&r.root)
                .preset(nv)
                .and_then(|preset| preset.digest.as_ref())
            {
                digest_type = DigesterType::of(Some(preset_digest));
            }
            if digest_type.normalisation_algorithm != JSON_NORMALISATION_V1 {
                return Err(Error::UnknownAlgorithm {
                    kind: "normalisation",
                    name: digest_type.normalisation_algorithm,
                });
            }
            let hasher = opts
                .registry
                .hasher(&digest_type.hash_algorithm)
                .map_err(|_| Error::UnknownAlgorithm {
                    kind: "hash",
                    name: digest_type.hash_algorithm.clone(),
                })?;
            let digest =
                cdsig_crypto::hash_component_descriptor(&self.state.ctx(&r).descriptor, hasher.as_ref())
                    .map_err(|e| match e {
                        cdsig_crypto::Error::Normalise(source) => Error::Normalise {
                            component: nv.clone(),
                            source,
                        },
                        e => Error::Crypto(e),
                    })?;
            tracing::debug!(cv = %nv, digest = %digest, "descriptor digested");
            spec = Some(digest);
        }

        if opts.do_verify() {
            let cd = self.state.ctx(&r).descriptor.clone();
            if let Some(verified) = verify_signatures(&cd, nv, &opts.signature_names, &opts)? {
                spec = Some(verified);
            }
        }
        self.state.propagate(&r, spec)?;

        if opts.do_sign() {
            let name = opts.signature_name()?;
            let present = self.state.ctx(&r).descriptor.signature_index(name).is_some();
            if !opts.do_verify() || !present {
                self.sign_descriptor(&r, &opts)?;
            }
            self.state.ctx_mut(&r).signed = true;
        }

        if !privately_signed && opts.do_update() {
            let updated = self.build_update(&r, &opts, cv.descriptor());
            cv.update(&updated)?;
        }
        Ok(r)
    }

    /// For a pure verification walk, decide which signatures to verify
    /// and which digest type governs the root.
    fn determine_signature_info(&mut self, r: &CtxRef, opts: &mut Options) -> Result<()> {
        let signatures = self.state.ctx(r).descriptor.signatures.clone();

        let mut digest_type = DigesterType::default();
        if let Some(name) = &opts.signature_name {
            let sig = signatures
                .iter()
                .find(|s| &s.name == name)
                .ok_or_else(|| Error::SignatureNotFound {
                    component: r.nv.clone(),
                    name: name.clone(),
                })?;
            digest_type = DigesterType::of(Some(&sig.digest));
        }

        let mut names = Vec::new();
        for sig in &signatures {
            let sig_type = DigesterType::of(Some(&sig.digest));
            if opts.keys.public_key(&sig.name).is_some() {
                if digest_type.is_initial() {
                    digest_type = sig_type.clone();
                }
                if digest_type == sig_type {
                    names.push(sig.name.clone());
                } else {
                    tracing::warn!(signature = %sig.name, cv = %r.nv,
                        "skipping signature with deviating digest type");
                }
            } else if opts.signature_name.as_deref() == Some(sig.name.as_str())
                || opts.signature_name.is_none()
            {
                if sig.signature.media_type == MEDIA_TYPE_PEM {
                    // key can be extracted from the embedded cert chain
                    if digest_type.is_initial() {
                        digest_type = sig_type.clone();
                    }
                    if digest_type == sig_type {
                        names.push(sig.name.clone());
                    }
                } else if opts.signature_name.is_some() {
                    return Err(Error::KeyNotFound {
                        kind: "public",
                        name: sig.name.clone(),
                    });
                }
            }
        }
        if names.is_empty() {
            return Err(Error::NoVerifiableSignature {
                component: r.nv.clone(),
            });
        }
        opts.signature_names = names;
        self.state.root_mut(&r.root).digest_type = digest_type;
        Ok(())
    }

    fn calculate_reference_digests(&mut self, r: &CtxRef, opts: &Options) -> Result<()> {
        let references = self
            .state
            .ctx(r)
            .descriptor
            .component
            .component_references
            .clone();
        for (i, reference) in references.iter().enumerate() {
            let rnv = reference.target();
            opts.check_cancelled(&rnv)?;

            let known = self
                .state
                .lookup(&rnv, &r.root)
                .is_some_and(|ctx| ctx.digest.is_some());
            let nref = if !known || opts.recursive || opts.do_verify() {
                let mut nested = self.resolver.lookup(rnv.name(), rnv.version())?;
                let nested_opts = opts.nested();
                self.apply(nested.as_mut(), &nested_opts, Some(&r.root))?
            } else {
                tracing::debug!(reference = %rnv, "accepting reference digest from context");
                CtxRef {
                    nv: rnv.clone(),
                    root: r.root.clone(),
                }
            };

            let calculated =
                self.state
                    .ctx(&nref)
                    .digest
                    .clone()
                    .ok_or_else(|| Error::MissingDigest {
                        component: r.nv.clone(),
                        what: format!("reference {}", reference.name),
                    })?;

            if let Some(stored) = &reference.digest {
                let comparable = DigesterType::of(Some(stored)) == DigesterType::of(Some(&calculated));
                if self.state.ctx(r).is_root() && comparable && stored != &calculated {
                    return Err(Error::DigestMismatch {
                        component: r.nv.clone(),
                        what: format!("reference {}", reference.name),
                        calculated: calculated.to_string(),
                        stored: stored.to_string(),
                    });
                }
            }
            if let Some(preset_digest) = self
                .state
                .root(&r.root)
                .input
                .get(&rnv)
                .and_then(|preset| preset.digest.as_ref())
            {
                let comparable =
                    DigesterType::of(Some(preset_digest)) == DigesterType::of(Some(&calculated));
                if comparable && preset_digest != &calculated {
                    return Err(Error::DigestMismatch {
                        component: r.nv.clone(),
                        what: format!("reference {}", reference.name),
                        calculated: calculated.to_string(),
                        stored: preset_digest.to_string(),
                    });
                }
            }

            tracing::debug!(reference = %rnv, digest = %calculated, "reference digested");
            let nested_refs = self.state.ctx(&nref).refs.clone();
            let ctx = self.state.ctx_mut(r);
            ctx.descriptor.component.component_references[i].digest = Some(calculated.clone());
            ctx.refs.extend(nested_refs);
            ctx.refs.insert(rnv, calculated);
        }
        Ok(())
    }

    fn calculate_resource_digests(
        &mut self,
        r: &CtxRef,
        cv: &mut dyn ComponentVersionAccess,
        opts: &Options,
    ) -> Result<()> {
        let preset = self.state.root(&r.root).preset(&r.nv).cloned();
        let sign_root = self.state.root(&r.root).sign;
        let is_root = self.state.ctx(r).is_root();
        let default_hash = self.state.root(&r.root).digest_type.hash_algorithm.clone();
        let resources = self.state.ctx(r).descriptor.component.resources.clone();

        let mut digesters: BTreeMap<String, ResourceDigester> = BTreeMap::new();

        for (i, resource) in resources.iter().enumerate() {
            let mut resource = resource.clone();
            if resource.has_none_access() {
                self.state.ctx_mut(r).descriptor.component.resources[i].digest = None;
                continue;
            }
            if resource.digest.is_none() {
                if let Some(access) = &resource.access {
                    if opts.skip_access_types.contains(access.kind()) {
                        resource.digest = Some(DigestSpec::exclude_from_signature());
                    }
                }
            }
            if resource.digest.as_ref().is_some_and(|d| d.is_excluded()) {
                tracing::debug!(resource = %resource.name, "resource excluded from signing");
                self.state.ctx_mut(r).descriptor.component.resources[i].digest = resource.digest;
                continue;
            }

            // digest requirement: preset digests win over stored ones,
            // stored ones are dropped when collapsing into a fresh top
            // mode signature with a different hash
            let mut required: Option<DigestSpec> = None;
            if let Some(stored) = &resource.digest {
                if is_root
                    || opts.digest_mode != DigestMode::Top
                    || stored.hash_algorithm == default_hash
                {
                    required = Some(stored.clone());
                }
            }
            if let Some(fixed) = preset.as_ref().and_then(|p| {
                p.lookup(&resource.name, &resource.version, &resource.extra_identity)
            }) {
                if !sign_root || fixed.digest.hash_algorithm == default_hash {
                    required = Some(fixed.digest.clone());
                }
            }

            let hash = required
                .as_ref()
                .map(|d| d.hash_algorithm.clone())
                .unwrap_or_else(|| default_hash.clone());
            let digester = match digesters.entry(hash.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let hasher =
                        opts.registry
                            .hasher(&hash)
                            .map_err(|_| Error::UnknownAlgorithm {
                                kind: "hash",
                                name: hash.clone(),
                            })?;
                    let digester = ResourceDigester::new(opts.oci.clone(), hasher).map_err(|e| {
                        Error::Digest {
                            component: r.nv.clone(),
                            resource: resource.name.clone(),
                            source: e,
                        }
                    })?;
                    entry.insert(digester)
                }
            };

            let calculated = digester
                .digest_for_resource(&resource, cv.blob_resolver(), &opts.cancel)
                .map_err(|e| match e {
                    cdsig_digest::Error::Cancelled => Error::Cancelled {
                        component: r.nv.clone(),
                    },
                    e => Error::Digest {
                        component: r.nv.clone(),
                        resource: resource.name.clone(),
                        source: e,
                    },
                })?
                .ok_or_else(|| Error::MissingDigest {
                    component: r.nv.clone(),
                    what: format!("resource {}", resource.name),
                })?;

            if let Some(expected) = &required {
                if expected != &calculated {
                    return Err(Error::DigestMismatch {
                        component: r.nv.clone(),
                        what: format!("resource {}", resource.name),
                        calculated: calculated.to_string(),
                        stored: expected.to_string(),
                    });
                }
            }
            if let Some(stored) = &resource.digest {
                let comparable =
                    DigesterType::of(Some(stored)) == DigesterType::of(Some(&calculated));
                if comparable && stored != &calculated {
                    return Err(Error::DigestMismatch {
                        component: r.nv.clone(),
                        what: format!("resource {}", resource.name),
                        calculated: calculated.to_string(),
                        stored: stored.to_string(),
                    });
                }
            }

            tracing::debug!(resource = %resource.name, digest = %calculated, "resource digested");
            self.state.ctx_mut(r).descriptor.component.resources[i].digest = Some(calculated);
        }
        Ok(())
    }

    fn sign_descriptor(&mut self, r: &CtxRef, opts: &Options) -> Result<()> {
        let name = opts.signature_name()?;
        let digest = self
            .state
            .ctx(r)
            .digest
            .clone()
            .ok_or_else(|| Error::MissingDigest {
                component: r.nv.clone(),
                what: "component descriptor".to_string(),
            })?;
        let signer = opts
            .signer
            .as_ref()
            .ok_or_else(|| Error::InvalidOptions("no signer configured".to_string()))?;
        let private_key = opts.keys.private_key(name).ok_or_else(|| Error::KeyNotFound {
            kind: "private",
            name: name.to_string(),
        })?;

        let sctx = cdsig_crypto::SigningContext {
            hash_algorithm: &digest.hash_algorithm,
            private_key,
            issuer: opts.issuer.as_deref().unwrap_or(""),
        };
        let spec = signer.sign(&digest.value, &sctx)?;
        if let Some(expected) = &opts.issuer {
            if !spec.issuer.is_empty() && !match_distinguished_name(expected, &spec.issuer) {
                return Err(Error::IssuerMismatch {
                    expected: expected.clone(),
                    actual: spec.issuer,
                });
            }
        }

        let mut signature = Signature {
            name: name.to_string(),
            digest: digest.clone(),
            signature: spec,
            timestamp: None,
        };
        if let Some(url) = &opts.tsa_url {
            signature.timestamp = Some(self.request_timestamp(url, name, &digest)?);
        }

        tracing::info!(cv = %r.nv, signature = %name, digest = %digest, "descriptor signed");
        self.state.ctx_mut(r).descriptor.set_signature(signature);
        Ok(())
    }

    /// Obtain an RFC 3161 timestamp over the descriptor digest.
    fn request_timestamp(
        &self,
        url: &str,
        name: &str,
        digest: &DigestSpec,
    ) -> Result<TimestampSpec> {
        let raw = hex::decode(&digest.value).map_err(cdsig_crypto::Error::from)?;
        let algorithm = AlgorithmIdentifier::for_hash_algorithm(&digest.hash_algorithm).map_err(
            |source| Error::Timestamp {
                name: name.to_string(),
                source,
            },
        )?;
        let client = TimestampClient::new(url).map_err(|source| Error::Timestamp {
            name: name.to_string(),
            source,
        })?;
        let token = client
            .timestamp(&raw, algorithm)
            .map_err(|source| Error::Timestamp {
                name: name.to_string(),
                source,
            })?;
        Ok(TimestampSpec {
            value: token.to_pem(),
            time: token.gen_time(),
        })
    }

    /// Merge the walk results into the stored descriptor.
    ///
    /// Only digests, `nestedDigests` and signatures are written; any
    /// other local modification of the stored descriptor survives.
    fn build_update(
        &self,
        r: &CtxRef,
        opts: &Options,
        stored: &ComponentDescriptor,
    ) -> ComponentDescriptor {
        let ctx = self.state.ctx(r);
        let mut updated = stored.clone();
        for (i, resource) in ctx.descriptor.component.resources.iter().enumerate() {
            updated.component.resources[i].digest = resource.digest.clone();
        }
        if opts.store_locally() {
            for (i, reference) in ctx.descriptor.component.component_references.iter().enumerate()
            {
                updated.component.component_references[i].digest = reference.digest.clone();
            }
        } else {
            updated.nested_digests = self.state.nested_digests(r);
        }
        if opts.do_sign() {
            updated.signatures = ctx.descriptor.signatures.clone();
        }
        updated
    }
}
