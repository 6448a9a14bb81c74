//! Deterministic component descriptor normalization
//!
//! Implements `jsonNormalisation/v1`: a component descriptor is reduced
//! to an ordered tree of single-key entries, object keys are sorted
//! lexicographically (array order is kept, since resource and reference
//! order is part of the component identity), and the tree is serialized as
//! compact JSON. Two descriptors that differ only in field insertion
//! order or in fields excluded by policy normalize to identical bytes.
//!
//! Excluded from the normalized form: `signatures`, `nestedDigests`,
//! `sources`, `repositoryContexts`, and everything inside a resource
//! access except its effect on digest presence. They would either create
//! a circular dependency on the descriptor's own hash or are not part of
//! the signed identity.

mod entry;
mod error;

pub use entry::{Entry, Value};
pub use error::{Error, Result};

use cdsig_types::{ComponentDescriptor, ExtraIdentity};

/// Produce the canonical byte sequence of a descriptor.
///
/// Fails if the descriptor is not normalizable: every component
/// reference needs a complete digest, every resource with non-None
/// access needs a digest, and resources with None or absent access must
/// not carry one.
pub fn normalise(cd: &ComponentDescriptor) -> Result<Vec<u8>> {
    ensure_normalisable(cd)?;

    let meta = Value::Entries(vec![Entry::new(
        "schemaVersion",
        Value::string(&cd.meta.schema_version),
    )]);

    let mut references = Vec::new();
    for reference in &cd.component.component_references {
        // ensure_normalisable guarantees the digest is present
        let digest = reference
            .digest
            .as_ref()
            .ok_or_else(|| Error::MissingReferenceDigest {
                name: reference.name.clone(),
                version: reference.version.clone(),
            })?;
        references.push(Value::Entries(vec![
            Entry::new("componentName", Value::string(&reference.component_name)),
            Entry::new("name", Value::string(&reference.name)),
            Entry::new("version", Value::string(&reference.version)),
            Entry::new(
                "extraIdentity",
                extra_identity_value(&reference.extra_identity),
            ),
            Entry::new("digest", digest_value(digest)),
        ]));
    }

    let mut resources = Vec::new();
    for resource in &cd.component.resources {
        let mut entries = vec![
            Entry::new("name", Value::string(&resource.name)),
            Entry::new("version", Value::string(&resource.version)),
            Entry::new("type", Value::string(&resource.resource_type)),
            Entry::new("relation", Value::string(&resource.relation)),
            Entry::new(
                "extraIdentity",
                extra_identity_value(&resource.extra_identity),
            ),
        ];
        // resources without effective access carry no digest entry
        if !resource.has_none_access() {
            let digest = resource
                .digest
                .as_ref()
                .ok_or_else(|| Error::MissingResourceDigest {
                    name: resource.name.clone(),
                    version: resource.version.clone(),
                })?;
            entries.push(Entry::new("digest", digest_value(digest)));
        }
        resources.push(Value::Entries(entries));
    }

    let component = Value::Entries(vec![
        Entry::new("name", Value::string(&cd.component.name)),
        Entry::new("version", Value::string(&cd.component.version)),
        Entry::new("provider", Value::string(&cd.component.provider)),
        Entry::new("componentReferences", Value::List(references)),
        Entry::new("resources", Value::List(resources)),
    ]);

    let mut root = vec![
        Entry::new("meta", meta),
        Entry::new("component", component),
    ];
    entry::deep_sort(&mut root);

    Ok(serde_json::to_vec(&root)?)
}

fn digest_value(digest: &cdsig_types::DigestSpec) -> Value {
    Value::Entries(vec![
        Entry::new("hashAlgorithm", Value::string(&digest.hash_algorithm)),
        Entry::new(
            "normalisationAlgorithm",
            Value::string(&digest.normalisation_algorithm),
        ),
        Entry::new("value", Value::string(&digest.value)),
    ])
}

// An empty identity normalizes to null to stay wire-compatible with
// existing digests.
fn extra_identity_value(extra: &ExtraIdentity) -> Value {
    if extra.is_empty() {
        return Value::Null;
    }
    Value::Entries(
        extra
            .iter()
            .map(|(k, v)| Entry::new(k.clone(), Value::string(v)))
            .collect(),
    )
}

fn ensure_normalisable(cd: &ComponentDescriptor) -> Result<()> {
    for reference in &cd.component.component_references {
        let ok = reference
            .digest
            .as_ref()
            .map(|d| d.is_complete())
            .unwrap_or(false);
        if !ok {
            return Err(Error::MissingReferenceDigest {
                name: reference.name.clone(),
                version: reference.version.clone(),
            });
        }
    }
    for resource in &cd.component.resources {
        if resource.has_none_access() {
            if resource.digest.is_some() {
                return Err(Error::DigestWithNoneAccess {
                    name: resource.name.clone(),
                    version: resource.version.clone(),
                });
            }
        } else if resource.digest.is_none() {
            return Err(Error::MissingResourceDigest {
                name: resource.name.clone(),
                version: resource.version.clone(),
            });
        }
    }
    Ok(())
}
