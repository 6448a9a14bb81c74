//! Digest injection without a full walk
//!
//! Fills in reference and resource digests of a single descriptor from
//! caller-supplied lookup functions. Used when the digests of the
//! closure are already known, for example from a previously signed
//! transport archive, and only this descriptor needs to be completed.

use cdsig_types::{ComponentDescriptor, ComponentReference, DigestSpec, DigesterType, Resource};

use crate::error::{Error, Result};

/// Set the digests of all references and resources of `cd`.
///
/// `reference_digest` must produce the descriptor digest of a referenced
/// component version; `resource_digest` the content digest of a
/// resource, or `None` for resources without digestible content.
/// Stored digests of the same digester type must agree with the
/// supplied ones. Excluded resources are left untouched.
pub fn add_digests_to_component_descriptor<R, S>(
    cd: &mut ComponentDescriptor,
    mut reference_digest: R,
    mut resource_digest: S,
) -> Result<()>
where
    R: FnMut(&ComponentDescriptor, &ComponentReference) -> Result<DigestSpec>,
    S: FnMut(&ComponentDescriptor, &Resource) -> Result<Option<DigestSpec>>,
{
    let nv = cd.name_version();

    for i in 0..cd.component.component_references.len() {
        let reference = cd.component.component_references[i].clone();
        let digest = reference_digest(cd, &reference)?;
        if let Some(stored) = &reference.digest {
            if stored != &digest {
                return Err(Error::DigestMismatch {
                    component: nv,
                    what: format!("reference {}", reference.name),
                    calculated: digest.to_string(),
                    stored: stored.to_string(),
                });
            }
        }
        cd.component.component_references[i].digest = Some(digest);
    }

    for i in 0..cd.component.resources.len() {
        let resource = cd.component.resources[i].clone();
        if resource.has_none_access() {
            cd.component.resources[i].digest = None;
            continue;
        }
        if resource.digest.as_ref().is_some_and(|d| d.is_excluded()) {
            continue;
        }
        let Some(digest) = resource_digest(cd, &resource)? else {
            continue;
        };
        if let Some(stored) = &resource.digest {
            let comparable = DigesterType::of(Some(stored)) == DigesterType::of(Some(&digest));
            if comparable && stored != &digest {
                return Err(Error::DigestMismatch {
                    component: nv,
                    what: format!("resource {}", resource.name),
                    calculated: digest.to_string(),
                    stored: stored.to_string(),
                });
            }
        }
        cd.component.resources[i].digest = Some(digest);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use cdsig_types::{AccessSpec, GENERIC_BLOB_DIGEST_V1, JSON_NORMALISATION_V1};

    use super::*;

    fn descriptor() -> ComponentDescriptor {
        let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
        cd.component.component_references.push(ComponentReference {
            name: "lib".to_string(),
            component_name: "acme.org/lib".to_string(),
            version: "2.0.0".to_string(),
            extra_identity: Default::default(),
            digest: None,
        });
        cd.component.resources.push(Resource {
            name: "blob".to_string(),
            version: "1.0.0".to_string(),
            resource_type: "blob".to_string(),
            relation: "local".to_string(),
            extra_identity: Default::default(),
            access: Some(AccessSpec::LocalOciBlob {
                digest: "sha256:00".to_string(),
            }),
            digest: None,
        });
        cd
    }

    fn ref_digest() -> DigestSpec {
        DigestSpec::new("sha256", JSON_NORMALISATION_V1, "11".repeat(32))
    }

    fn res_digest() -> DigestSpec {
        DigestSpec::new("sha256", GENERIC_BLOB_DIGEST_V1, "22".repeat(32))
    }

    #[test]
    fn fills_in_all_digests() {
        let mut cd = descriptor();
        add_digests_to_component_descriptor(
            &mut cd,
            |_, _| Ok(ref_digest()),
            |_, _| Ok(Some(res_digest())),
        )
        .unwrap();
        assert_eq!(cd.component.component_references[0].digest, Some(ref_digest()));
        assert_eq!(cd.component.resources[0].digest, Some(res_digest()));
    }

    #[test]
    fn contradicting_stored_reference_digest_fails() {
        let mut cd = descriptor();
        cd.component.component_references[0].digest =
            Some(DigestSpec::new("sha256", JSON_NORMALISATION_V1, "ff".repeat(32)));
        let err = add_digests_to_component_descriptor(
            &mut cd,
            |_, _| Ok(ref_digest()),
            |_, _| Ok(Some(res_digest())),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DigestMismatch { .. }));
    }

    #[test]
    fn excluded_resources_are_preserved() {
        let mut cd = descriptor();
        cd.component.resources[0].digest = Some(DigestSpec::exclude_from_signature());
        add_digests_to_component_descriptor(
            &mut cd,
            |_, _| Ok(ref_digest()),
            |_, _| panic!("excluded resource must not be digested"),
        )
        .unwrap();
        assert!(cd.component.resources[0].digest.as_ref().unwrap().is_excluded());
    }

    #[test]
    fn matching_stored_digests_are_accepted() {
        let mut cd = descriptor();
        cd.component.resources[0].digest = Some(res_digest());
        add_digests_to_component_descriptor(
            &mut cd,
            |_, _| Ok(ref_digest()),
            |_, _| Ok(Some(res_digest())),
        )
        .unwrap();
    }
}
