//! Component descriptor schema
//!
//! The persisted wire format is stable: top-level `meta.schemaVersion`,
//! `component.{name,version,provider,resources[],componentReferences[],
//! repositoryContexts[]}`, `signatures[]` and `nestedDigests[]`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::access::AccessSpec;
use crate::digest::{DigestSpec, NestedComponentDigests};
use crate::signature::Signature;

/// Schema version of the v2 component descriptor format.
pub const SCHEMA_VERSION_V2: &str = "v2";

/// Extra identity attributes distinguishing artifacts that share a name.
///
/// A `BTreeMap` keeps the attributes in a stable order, which the
/// normalizer relies on.
pub type ExtraIdentity = BTreeMap<String, String>;

/// A (name, version) key identifying one component version in the
/// reference graph. Used for visited sets and digest memo tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameVersion {
    name: String,
    version: String,
}

impl NameVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for NameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Top-level descriptor metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V2.to_string(),
        }
    }
}

/// The component payload of a descriptor: identity, provenance and the
/// ordered artifact lists. Resource and reference order is part of the
/// component identity and is never reordered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub provider: String,
    #[serde(
        default,
        rename = "repositoryContexts",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub repository_contexts: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(
        default,
        rename = "componentReferences",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub component_references: Vec<ComponentReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

/// A named, versioned bundle of resources and references to other
/// component versions. This is the unit that gets normalized, digested
/// and signed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub meta: Metadata,
    pub component: ComponentSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,
    #[serde(default, rename = "nestedDigests", skip_serializing_if = "Vec::is_empty")]
    pub nested_digests: Vec<NestedComponentDigests>,
}

impl ComponentDescriptor {
    /// Create a descriptor with the given identity and an otherwise
    /// empty component spec.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            meta: Metadata::default(),
            component: ComponentSpec {
                name: name.into(),
                version: version.into(),
                ..Default::default()
            },
            signatures: Vec::new(),
            nested_digests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn version(&self) -> &str {
        &self.component.version
    }

    pub fn name_version(&self) -> NameVersion {
        NameVersion::new(&self.component.name, &self.component.version)
    }

    /// Index of the signature with the given name, if present.
    pub fn signature_index(&self, name: &str) -> Option<usize> {
        self.signatures.iter().position(|s| s.name == name)
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.name == name)
    }

    /// Add a signature, replacing an existing one of the same name.
    pub fn set_signature(&mut self, signature: Signature) {
        match self.signature_index(&signature.name) {
            Some(i) => self.signatures[i] = signature,
            None => self.signatures.push(signature),
        }
    }
}

/// A content artifact owned by a component version.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub version: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub relation: String,
    #[serde(
        default,
        rename = "extraIdentity",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra_identity: ExtraIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,
}

impl Resource {
    /// Whether the resource has no effective access (absent or kind
    /// `None`). Such resources carry no digest.
    pub fn has_none_access(&self) -> bool {
        match &self.access {
            None => true,
            Some(a) => a.is_none(),
        }
    }
}

/// A pointer from one component version to another. Its digest must
/// equal the hash of the referenced component's normalized descriptor
/// before the owning descriptor can be normalized.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentReference {
    pub name: String,
    #[serde(rename = "componentName")]
    pub component_name: String,
    pub version: String,
    #[serde(
        default,
        rename = "extraIdentity",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra_identity: ExtraIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestSpec>,
}

impl ComponentReference {
    /// Key of the referenced component version.
    pub fn target(&self) -> NameVersion {
        NameVersion::new(&self.component_name, &self.version)
    }
}

/// A source artifact. Sources are not part of the signed content and
/// are excluded from normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub version: String,
    #[serde(default, rename = "type")]
    pub source_type: String,
    #[serde(
        default,
        rename = "extraIdentity",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra_identity: ExtraIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureSpec;

    #[test]
    fn name_version_display() {
        let nv = NameVersion::new("acme.org/comp", "v1.0.0");
        assert_eq!(nv.to_string(), "acme.org/comp:v1.0.0");
    }

    #[test]
    fn set_signature_replaces_same_name() {
        let mut cd = ComponentDescriptor::new("c", "v1");
        let sig = |value: &str| Signature {
            name: "sig".to_string(),
            digest: DigestSpec::default(),
            signature: SignatureSpec {
                value: value.to_string(),
                ..Default::default()
            },
            timestamp: None,
        };
        cd.set_signature(sig("a"));
        cd.set_signature(sig("b"));
        assert_eq!(cd.signatures.len(), 1);
        assert_eq!(cd.signatures[0].signature.value, "b");
    }

    #[test]
    fn wire_format_round_trip() {
        let json = r#"{
            "meta": {"schemaVersion": "v2"},
            "component": {
                "name": "acme.org/comp",
                "version": "v1.0.0",
                "provider": "acme",
                "componentReferences": [
                    {"name": "ref", "componentName": "acme.org/dep", "version": "v0.1.0"}
                ],
                "resources": [
                    {
                        "name": "image",
                        "version": "v1.0.0",
                        "type": "ociImage",
                        "relation": "external",
                        "extraIdentity": {"arch": "amd64"},
                        "access": {"type": "ociRegistry", "imageReference": "acme/img:v1"},
                        "digest": {
                            "hashAlgorithm": "sha256",
                            "normalisationAlgorithm": "ociArtifactDigest/v1",
                            "value": "abc"
                        }
                    }
                ]
            }
        }"#;
        let cd: ComponentDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(cd.name(), "acme.org/comp");
        assert_eq!(cd.component.resources[0].extra_identity["arch"], "amd64");
        let out = serde_json::to_string(&cd).unwrap();
        let back: ComponentDescriptor = serde_json::from_str(&out).unwrap();
        assert_eq!(cd, back);
    }
}
