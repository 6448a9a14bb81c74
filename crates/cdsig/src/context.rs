//! Digest contexts
//!
//! Every component version is digested relative to a root context: the
//! signed root determines the hash algorithm and, through persisted
//! `nestedDigests`, which resource digests are already fixed. One version
//! can take part in several root walks and then owns one digest context
//! per root, kept in an arena keyed by `NameVersion` rather than linked
//! through parent pointers.

use std::collections::BTreeMap;

use cdsig_types::{
    ArtifactDigest, ComponentDescriptor, DigestSpec, DigesterType, NameVersion,
    NestedComponentDigests,
};

use crate::error::{Error, Result};
use crate::options::DigestMode;

/// Per-root walk state shared by all digest contexts of one root.
#[derive(Debug)]
pub(crate) struct RootInfo {
    pub ctx_key: NameVersion,
    pub sign: bool,
    pub digest_type: DigesterType,
    /// Digest sets fixed before the walk, from persisted `nestedDigests`.
    pub input: BTreeMap<NameVersion, NestedComponentDigests>,
    /// Digest sets produced by the walk.
    pub output: BTreeMap<NameVersion, NestedComponentDigests>,
}

impl RootInfo {
    /// Seed a fresh root from the root descriptor's persisted digests.
    ///
    /// With no `nestedDigests` present, a fully digested descriptor
    /// fixes its own resource digests instead.
    pub fn new(cd: &ComponentDescriptor) -> Self {
        let key = cd.name_version();
        let mut input = BTreeMap::new();
        for nested in &cd.nested_digests {
            input.insert(nested.name_version(), nested.clone());
        }
        if input.is_empty() {
            let (digests, all) = collect_resource_digests(cd);
            if all && !digests.resources.is_empty() {
                input.insert(key.clone(), digests);
            }
        }
        Self {
            ctx_key: key,
            sign: false,
            digest_type: DigesterType::default(),
            input,
            output: BTreeMap::new(),
        }
    }

    /// The digest set already fixed for a component version, produced
    /// digests taking precedence over seeded ones.
    pub fn preset(&self, nv: &NameVersion) -> Option<&NestedComponentDigests> {
        self.output.get(nv).or_else(|| self.input.get(nv))
    }
}

/// The digesting state of one component version under one root.
#[derive(Debug)]
pub(crate) struct DigestContext {
    pub key: NameVersion,
    pub ctx_key: NameVersion,
    /// Working copy; digests and signatures are written here first.
    pub descriptor: ComponentDescriptor,
    pub digest: Option<DigestSpec>,
    pub signed: bool,
    /// Root key of the context this one was reused from.
    pub source: Option<NameVersion>,
    /// Digests of all component versions reachable from here.
    pub refs: BTreeMap<NameVersion, DigestSpec>,
}

impl DigestContext {
    pub fn is_root(&self) -> bool {
        self.key == self.ctx_key
    }
}

/// Locates a digest context in the walking state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CtxRef {
    pub nv: NameVersion,
    pub root: NameVersion,
}

/// All digest contexts of one component version, keyed by root.
#[derive(Debug, Default)]
pub(crate) struct VersionInfo {
    pub contexts: BTreeMap<NameVersion, DigestContext>,
}

/// Shared state of one walk over the reference graph.
///
/// `closure` doubles as the visited set; `history` is the current
/// recursion stack, used for cycle detection.
#[derive(Debug, Default)]
pub(crate) struct WalkingState {
    pub closure: BTreeMap<NameVersion, VersionInfo>,
    pub roots: BTreeMap<NameVersion, RootInfo>,
    pub history: Vec<NameVersion>,
}

impl WalkingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self, key: &NameVersion) -> &RootInfo {
        &self.roots[key]
    }

    pub fn root_mut(&mut self, key: &NameVersion) -> &mut RootInfo {
        self.roots.get_mut(key).unwrap_or_else(|| unreachable!())
    }

    pub fn ctx(&self, r: &CtxRef) -> &DigestContext {
        &self.closure[&r.nv].contexts[&r.root]
    }

    pub fn ctx_mut(&mut self, r: &CtxRef) -> &mut DigestContext {
        self.closure
            .get_mut(&r.nv)
            .and_then(|vi| vi.contexts.get_mut(&r.root))
            .unwrap_or_else(|| unreachable!())
    }

    /// The context a component version has under a given root, if any.
    pub fn lookup(&self, nv: &NameVersion, root: &NameVersion) -> Option<&DigestContext> {
        self.closure.get(nv).and_then(|vi| vi.contexts.get(root))
    }

    /// Create the digest context for `cd` under `parent_root`, or under
    /// a fresh root when there is no parent. When another context of the
    /// same version is compatible with the new root, its results are
    /// taken over.
    pub fn create_context(
        &mut self,
        cd: &ComponentDescriptor,
        parent_root: Option<&NameVersion>,
    ) -> Result<CtxRef> {
        let nv = cd.name_version();
        let root_key = match parent_root {
            Some(key) => key.clone(),
            None => {
                let root = RootInfo::new(cd);
                let key = root.ctx_key.clone();
                self.roots.insert(key.clone(), root);
                key
            }
        };

        let mut ctx = DigestContext {
            key: nv.clone(),
            ctx_key: root_key.clone(),
            descriptor: cd.clone(),
            digest: None,
            signed: false,
            source: None,
            refs: BTreeMap::new(),
        };

        let r = CtxRef {
            nv: nv.clone(),
            root: root_key.clone(),
        };
        if parent_root.is_some() {
            if let Some(vi) = self.closure.get(&nv) {
                let candidate = vi
                    .contexts
                    .values()
                    .find(|existing| self.valid_for(existing, &root_key))
                    .map(|existing| existing.ctx_key.clone());
                if let Some(source_root) = candidate {
                    self.take_over(&mut ctx, &nv, &source_root)?;
                }
            }
        }

        let vi = self.closure.entry(nv).or_default();
        // one context per root; revisits reuse it instead
        debug_assert!(!vi.contexts.contains_key(&root_key));
        vi.contexts.insert(root_key, ctx);
        Ok(r)
    }

    /// Whether `candidate`'s results do not contradict anything already
    /// fixed under `root_key`.
    fn valid_for(&self, candidate: &DigestContext, root_key: &NameVersion) -> bool {
        let candidate_root = self.root(&candidate.ctx_key);
        let target_root = self.root(root_key);
        for (nv, digests) in &candidate_root.output {
            if let Some(preset) = target_root.preset(nv) {
                if !preset.resources_match(&digests.resources) {
                    return false;
                }
            }
        }
        for (nv, digests) in &candidate_root.input {
            if candidate_root.output.contains_key(nv) {
                continue;
            }
            if let Some(preset) = target_root.preset(nv) {
                if !preset.resources_match(&digests.resources) {
                    return false;
                }
            }
        }
        true
    }

    /// Adopt the results of the compatible context under `source_root`
    /// into `ctx`, merging the source root's digest sets into the
    /// target root.
    fn take_over(
        &mut self,
        ctx: &mut DigestContext,
        nv: &NameVersion,
        source_root: &NameVersion,
    ) -> Result<()> {
        let source_output = self.root(source_root).output.clone();
        let target = self.root_mut(&ctx.ctx_key);
        for (key, digests) in source_output {
            if let Some(current) = target.output.get(&key) {
                if !current.resources_match(&digests.resources) {
                    return Err(Error::DigestMismatch {
                        component: key.clone(),
                        what: "resource digest set".to_string(),
                        calculated: format!("{} resources", digests.resources.len()),
                        stored: format!("{} resources", current.resources.len()),
                    });
                }
            } else {
                target.output.insert(key, digests);
            }
        }

        let source = &self.closure[nv].contexts[source_root];
        ctx.refs = source.refs.clone();
        ctx.digest = source.digest.clone();
        ctx.descriptor = source.descriptor.clone();
        ctx.signed = source.signed;
        ctx.source = Some(source_root.clone());
        Ok(())
    }

    /// Publish the digest result of a finished context into its root.
    ///
    /// Requires all resources to be digested; a preset for the same
    /// version must agree with the calculated set.
    pub fn propagate(&mut self, r: &CtxRef, digest: Option<DigestSpec>) -> Result<()> {
        let ctx = self.ctx(r);
        let (mut digests, all) = collect_resource_digests(&ctx.descriptor);
        if !all {
            return Err(Error::MissingDigest {
                component: r.nv.clone(),
                what: "resources".to_string(),
            });
        }
        let digest = digest.or_else(|| ctx.digest.clone());
        digests.digest = digest.clone();

        let root = self.root(&r.root);
        let entry = match root.preset(&r.nv) {
            Some(preset) => {
                if !preset.resources_match(&digests.resources) {
                    return Err(Error::DigestMismatch {
                        component: r.nv.clone(),
                        what: "resource digest set".to_string(),
                        calculated: format!("{} resources", digests.resources.len()),
                        stored: format!("{} resources", preset.resources.len()),
                    });
                }
                preset.clone()
            }
            None => digests,
        };
        self.root_mut(&r.root).output.insert(r.nv.clone(), entry);
        self.ctx_mut(r).digest = digest;
        Ok(())
    }

    /// Adopt a context finished in its own private root into the outer
    /// context, unless its results contradict the outer root.
    pub fn adopt_if_valid(&mut self, outer: &CtxRef, inner: &CtxRef) -> Result<bool> {
        let inner_ctx = self.ctx(inner);
        if !self.valid_for(inner_ctx, &outer.root) {
            return Ok(false);
        }
        let source_root = inner.root.clone();
        let mut ctx = self
            .closure
            .get_mut(&outer.nv)
            .and_then(|vi| vi.contexts.remove(&outer.root))
            .unwrap_or_else(|| unreachable!());
        let result = self.take_over(&mut ctx, &inner.nv, &source_root);
        self.closure
            .get_mut(&outer.nv)
            .unwrap_or_else(|| unreachable!())
            .contexts
            .insert(outer.root.clone(), ctx);
        result.map(|()| true)
    }

    /// The nested digest sets of everything reachable from `r`, ordered
    /// by component key. Persisted as the root's `nestedDigests` in top
    /// mode.
    pub fn nested_digests(&self, r: &CtxRef) -> Vec<NestedComponentDigests> {
        let ctx = self.ctx(r);
        let root = self.root(&r.root);
        ctx.refs
            .keys()
            .filter_map(|nv| root.output.get(nv))
            .cloned()
            .collect()
    }

    pub fn history_string(&self) -> String {
        self.history
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Collect the resource digests of a descriptor, reporting whether every
/// digestible resource actually has one.
pub(crate) fn collect_resource_digests(
    cd: &ComponentDescriptor,
) -> (NestedComponentDigests, bool) {
    let mut all = true;
    let mut digests = NestedComponentDigests {
        name: cd.name().to_string(),
        version: cd.version().to_string(),
        digest: None,
        resources: Vec::new(),
    };
    for resource in &cd.component.resources {
        if resource.has_none_access() {
            continue;
        }
        match ArtifactDigest::of_resource(resource) {
            Some(artifact) => digests.resources.push(artifact),
            None => all = false,
        }
    }
    (digests, all)
}

/// The digest mode a descriptor is already committed to, if any.
///
/// Persisted `nestedDigests` fix top mode; a digested first reference
/// fixes local mode; otherwise the default applies.
pub(crate) fn digest_mode_of(cd: &ComponentDescriptor, default: DigestMode) -> DigestMode {
    if !cd.nested_digests.is_empty() {
        return DigestMode::Top;
    }
    if let Some(first) = cd.component.component_references.first() {
        if first.digest.is_some() {
            return DigestMode::Local;
        }
    }
    default
}
