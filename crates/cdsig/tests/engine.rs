//! End-to-end walks over an in-memory component repository.

mod common;

use std::sync::Arc;

use cdsig::{DigestMode, Error, Options};
use cdsig_crypto::RsaSigner;
use cdsig_types::{
    AccessSpec, CancelToken, ComponentDescriptor, DigestSpec, Resource, GENERIC_BLOB_DIGEST_V1,
    JSON_NORMALISATION_V1, MEDIA_TYPE_PEM, MEDIA_TYPE_RSA_SIGNATURE, OCI_ARTIFACT_DIGEST_V1,
};
use rstest::rstest;
use sha2::{Digest, Sha256};

use common::{blob_resource, key_pair, keys_for, reference, MapOci, MemoryRepo};

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn descriptor_hash(cd: &ComponentDescriptor) -> String {
    sha256_hex(&cdsig_normalize::normalise(cd).unwrap())
}

/// Repository with a root referencing one blob-backed child.
fn two_level_repo() -> MemoryRepo {
    let mut repo = MemoryRepo::new();
    let content = b"child blob content".to_vec();
    repo.add_blob("sha256:child-blob", content);

    let mut child = ComponentDescriptor::new("acme.org/lib", "2.0.0");
    child.component.resources.push(blob_resource("data", "sha256:child-blob"));
    repo.insert(child);

    let mut root = ComponentDescriptor::new("acme.org/app", "1.0.0");
    root.component
        .component_references
        .push(reference("lib", "acme.org/lib", "2.0.0"));
    repo.insert(root);
    repo
}

#[test]
fn digest_matches_normalised_hash() {
    let mut repo = MemoryRepo::new();
    let cd = ComponentDescriptor::new("CD-Name", "v0.0.1");
    repo.insert(cd.clone());

    let digest = cdsig::apply(&repo, "CD-Name", "v0.0.1", &Options::new()).unwrap();
    assert_eq!(digest.hash_algorithm, "sha256");
    assert_eq!(digest.normalisation_algorithm, JSON_NORMALISATION_V1);
    assert_eq!(digest.value, descriptor_hash(&cd));
}

#[test]
fn resource_digests_are_written_back() {
    let mut repo = MemoryRepo::new();
    let content = b"some blob".to_vec();
    let expected = sha256_hex(&content);
    repo.add_blob("sha256:blob", content);

    let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
    cd.component.resources.push(blob_resource("data", "sha256:blob"));
    repo.insert(cd);

    cdsig::apply(&repo, "acme.org/app", "1.0.0", &Options::new().update()).unwrap();

    let stored = repo.descriptor("acme.org/app", "1.0.0");
    let digest = stored.component.resources[0].digest.as_ref().unwrap();
    assert_eq!(digest.hash_algorithm, "sha256");
    assert_eq!(digest.normalisation_algorithm, GENERIC_BLOB_DIGEST_V1);
    assert_eq!(digest.value, expected);
}

#[test]
fn oci_resources_hash_the_raw_manifest() {
    let manifest = br#"{"schemaVersion":2}"#.to_vec();
    let mut oci = MapOci::new();
    oci.add("acme/app:v1", manifest.clone());

    let mut repo = MemoryRepo::new();
    let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
    cd.component.resources.push(Resource {
        name: "image".to_string(),
        version: "1.0.0".to_string(),
        resource_type: "ociImage".to_string(),
        relation: "external".to_string(),
        extra_identity: Default::default(),
        access: Some(AccessSpec::OciRegistry {
            image_reference: "acme/app:v1".to_string(),
        }),
        digest: None,
    });
    repo.insert(cd);

    let opts = Options::new().update().with_oci_client(Arc::new(oci));
    cdsig::apply(&repo, "acme.org/app", "1.0.0", &opts).unwrap();

    let stored = repo.descriptor("acme.org/app", "1.0.0");
    let digest = stored.component.resources[0].digest.as_ref().unwrap();
    assert_eq!(digest.normalisation_algorithm, OCI_ARTIFACT_DIGEST_V1);
    assert_eq!(digest.value, sha256_hex(&manifest));
}

#[test]
fn recursive_sign_then_verify_round_trip() {
    let repo = two_level_repo();
    let (private, public) = key_pair(1);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new()
        .sign("release")
        .recursive()
        .with_keys(keys.clone());
    let signed = cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    // reference digest equals the hash of the referenced descriptor
    let root = repo.descriptor("acme.org/app", "1.0.0");
    let child = repo.descriptor("acme.org/lib", "2.0.0");
    let ref_digest = root.component.component_references[0].digest.as_ref().unwrap();
    assert_eq!(ref_digest.value, descriptor_hash(&child));
    assert_eq!(root.signatures.len(), 1);
    assert_eq!(root.signatures[0].signature.media_type, MEDIA_TYPE_RSA_SIGNATURE);
    // recursive signing also signed the child
    assert_eq!(child.signatures.len(), 1);

    let before = repo.descriptor("acme.org/app", "1.0.0");
    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    let verified =
        cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts).unwrap();
    assert_eq!(verified, signed);
    // verification never writes back
    assert_eq!(repo.descriptor("acme.org/app", "1.0.0"), before);
}

#[test]
fn pem_signature_round_trip() {
    let repo = two_level_repo();
    let (private, public) = key_pair(2);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new()
        .sign("release")
        .with_signer(Arc::new(RsaSigner::pem()))
        .with_keys(keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    let root = repo.descriptor("acme.org/app", "1.0.0");
    assert_eq!(root.signatures[0].signature.media_type, MEDIA_TYPE_PEM);

    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts).unwrap();
}

#[test]
fn tampered_descriptor_fails_verification() {
    let repo = two_level_repo();
    let (private, public) = key_pair(3);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new().sign("release").with_keys(keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    let mut repo = repo;
    let mut root = repo.descriptor("acme.org/app", "1.0.0");
    root.component.provider = "mallory".to_string();
    repo.insert(root);

    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    let err = cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts)
        .unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));
}

#[test]
fn tampered_reference_digest_fails_verification() {
    let repo = two_level_repo();
    let (private, public) = key_pair(4);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new().sign("release").with_keys(keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    // swap the child's resource digest for a different value
    let mut repo = repo;
    let mut child = repo.descriptor("acme.org/lib", "2.0.0");
    child.component.resources[0].digest =
        Some(DigestSpec::new("sha256", GENERIC_BLOB_DIGEST_V1, "ff".repeat(32)));
    repo.insert(child);

    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    let err = cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts)
        .unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));
}

#[test]
fn retargeted_reference_fails_verification() {
    let repo = two_level_repo();
    let (private, public) = key_pair(9);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new().sign("release").with_keys(keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    // point the signed root at a different child version
    let mut repo = repo;
    let other = ComponentDescriptor::new("acme.org/lib", "2.0.1");
    repo.insert(other);
    let mut root = repo.descriptor("acme.org/app", "1.0.0");
    root.component.component_references[0].version = "2.0.1".to_string();
    repo.insert(root);

    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    let err = cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts)
        .unwrap_err();
    assert!(matches!(err, Error::DigestMismatch { .. }));
}

#[test]
fn verification_without_key_material_fails() {
    let repo = two_level_repo();
    let (private, public) = key_pair(5);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new().sign("release").with_keys(keys);
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    let verify_opts = Options::new().with_signature_name("release");
    let err = cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts)
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound { .. }));
}

#[test]
fn signing_without_private_key_fails() {
    let repo = two_level_repo();
    let opts = Options::new().sign("release");
    let err = cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &opts).unwrap_err();
    assert!(matches!(err, Error::KeyNotFound { kind: "private", .. }));
}

#[test]
fn shared_reference_is_resolved_once() {
    let mut repo = MemoryRepo::new();
    let shared = ComponentDescriptor::new("acme.org/shared", "1.0.0");
    repo.insert(shared);

    for name in ["acme.org/a", "acme.org/b"] {
        let mut cd = ComponentDescriptor::new(name, "1.0.0");
        cd.component
            .component_references
            .push(reference("shared", "acme.org/shared", "1.0.0"));
        repo.insert(cd);
    }
    let mut root = ComponentDescriptor::new("acme.org/root", "1.0.0");
    root.component
        .component_references
        .push(reference("a", "acme.org/a", "1.0.0"));
    root.component
        .component_references
        .push(reference("b", "acme.org/b", "1.0.0"));
    repo.insert(root);

    cdsig::apply(&repo, "acme.org/root", "1.0.0", &Options::new()).unwrap();
    // root, a, shared, b; the second edge to shared reuses the context
    assert_eq!(repo.lookup_count(), 4);
}

#[test]
fn top_mode_collapses_digests_into_the_root() {
    let repo = two_level_repo();
    let (private, public) = key_pair(6);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new()
        .sign("release")
        .with_digest_mode(DigestMode::Top)
        .with_keys(keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    let root = repo.descriptor("acme.org/app", "1.0.0");
    assert!(root.component.component_references[0].digest.is_none());
    assert_eq!(root.nested_digests.len(), 1);
    assert_eq!(root.nested_digests[0].name, "acme.org/lib");
    assert!(root.nested_digests[0].digest.is_some());
    // the child itself stays untouched in top mode
    let child = repo.descriptor("acme.org/lib", "2.0.0");
    assert!(child.component.resources[0].digest.is_none());

    // the persisted nested digests fix the mode for verification
    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts).unwrap();
}

#[test]
fn locally_signed_reference_survives_top_mode_resigning() {
    let mut repo = MemoryRepo::new();
    repo.add_blob("sha256:leaf-blob", b"leaf content".to_vec());

    let mut leaf = ComponentDescriptor::new("acme.org/leaf", "1.0.0");
    leaf.component.resources.push(blob_resource("data", "sha256:leaf-blob"));
    repo.insert(leaf);

    let mut mid = ComponentDescriptor::new("acme.org/mid", "1.0.0");
    mid.component
        .component_references
        .push(reference("leaf", "acme.org/leaf", "1.0.0"));
    repo.insert(mid);

    let mut app = ComponentDescriptor::new("acme.org/app", "1.0.0");
    app.component
        .component_references
        .push(reference("mid", "acme.org/mid", "1.0.0"));
    repo.insert(app);

    // the intermediate component is first signed on its own, committing
    // it to local-mode reference digests
    let (team_private, team_public) = key_pair(9);
    let team_keys = keys_for("team", team_private, team_public);
    let team_opts = Options::new()
        .sign("team")
        .recursive()
        .with_keys(team_keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/mid", "1.0.0", &team_opts).unwrap();
    assert!(repo
        .descriptor("acme.org/mid", "1.0.0")
        .component
        .component_references[0]
        .digest
        .is_some());

    // re-signing the tree above it in top mode walks the committed
    // version in its own context before adopting its digest
    let (release_private, release_public) = key_pair(10);
    let release_keys = keys_for("release", release_private, release_public);
    let sign_opts = Options::new()
        .sign("release")
        .recursive()
        .with_digest_mode(DigestMode::Top)
        .with_keys(release_keys.clone());
    let signed = cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    let root = repo.descriptor("acme.org/app", "1.0.0");
    assert!(root.component.component_references[0].digest.is_none());
    let nested: Vec<&str> = root.nested_digests.iter().map(|n| n.name.as_str()).collect();
    assert!(nested.contains(&"acme.org/mid"));
    assert!(nested.contains(&"acme.org/leaf"));

    // the intermediate keeps its local commitment and both signatures
    let mid_stored = repo.descriptor("acme.org/mid", "1.0.0");
    assert!(mid_stored.component.component_references[0].digest.is_some());
    assert!(mid_stored.signature("team").is_some());
    assert!(mid_stored.signature("release").is_some());

    let verify_opts = Options::new()
        .with_signature_name("release")
        .with_keys(release_keys);
    let verified =
        cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts).unwrap();
    assert_eq!(verified, signed);

    let mid_verify = Options::new().with_signature_name("team").with_keys(team_keys);
    cdsig::verify_component_version(&repo, "acme.org/mid", "1.0.0", &mid_verify).unwrap();
}

#[test]
fn cancellation_aborts_the_walk() {
    let repo = two_level_repo();
    let cancel = CancelToken::new();
    cancel.cancel();

    let opts = Options::new().with_cancel_token(cancel);
    let err = cdsig::apply(&repo, "acme.org/app", "1.0.0", &opts).unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
}

#[test]
fn reference_cycles_are_detected() {
    let mut repo = MemoryRepo::new();
    let mut a = ComponentDescriptor::new("acme.org/a", "1.0.0");
    a.component
        .component_references
        .push(reference("b", "acme.org/b", "1.0.0"));
    repo.insert(a);
    let mut b = ComponentDescriptor::new("acme.org/b", "1.0.0");
    b.component
        .component_references
        .push(reference("a", "acme.org/a", "1.0.0"));
    repo.insert(b);

    let err = cdsig::apply(&repo, "acme.org/a", "1.0.0", &Options::new()).unwrap_err();
    assert!(matches!(err, Error::CircularReference { .. }));
}

#[test]
fn excluded_resources_survive_signing_and_verify() {
    let mut repo = MemoryRepo::new();
    let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
    let mut excluded = blob_resource("generated", "sha256:unavailable");
    excluded.digest = Some(DigestSpec::exclude_from_signature());
    cd.component.resources.push(excluded);
    repo.insert(cd);

    let (private, public) = key_pair(7);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new().sign("release").with_keys(keys.clone());
    cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();

    // the blob was never fetched, the sentinel is preserved
    let stored = repo.descriptor("acme.org/app", "1.0.0");
    assert!(stored.component.resources[0].digest.as_ref().unwrap().is_excluded());

    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts).unwrap();
}

#[test]
fn skipped_access_types_get_the_exclusion_sentinel() {
    let mut repo = MemoryRepo::new();
    let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
    cd.component.resources.push(Resource {
        name: "bucket-data".to_string(),
        version: "1.0.0".to_string(),
        resource_type: "blob".to_string(),
        relation: "external".to_string(),
        extra_identity: Default::default(),
        access: Some(AccessSpec::S3 {
            bucket_name: "bucket".to_string(),
            object_key: "key".to_string(),
        }),
        digest: None,
    });
    repo.insert(cd);

    let opts = Options::new().update().skip_access_type("s3");
    cdsig::apply(&repo, "acme.org/app", "1.0.0", &opts).unwrap();

    let stored = repo.descriptor("acme.org/app", "1.0.0");
    assert!(stored.component.resources[0].digest.as_ref().unwrap().is_excluded());
}

#[test]
fn resources_without_access_are_not_digested() {
    let mut repo = MemoryRepo::new();
    let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
    cd.component.resources.push(Resource {
        name: "external-doc".to_string(),
        version: "1.0.0".to_string(),
        resource_type: "doc".to_string(),
        relation: "external".to_string(),
        extra_identity: Default::default(),
        access: Some(AccessSpec::None),
        digest: None,
    });
    repo.insert(cd);

    let digest = cdsig::apply(&repo, "acme.org/app", "1.0.0", &Options::new().update()).unwrap();
    assert!(!digest.value.is_empty());
    let stored = repo.descriptor("acme.org/app", "1.0.0");
    assert!(stored.component.resources[0].digest.is_none());
}

#[test]
fn unresolvable_reference_is_reported() {
    let mut repo = MemoryRepo::new();
    let mut cd = ComponentDescriptor::new("acme.org/app", "1.0.0");
    cd.component
        .component_references
        .push(reference("gone", "acme.org/gone", "1.0.0"));
    repo.insert(cd);

    let err = cdsig::apply(&repo, "acme.org/app", "1.0.0", &Options::new()).unwrap_err();
    assert!(matches!(err, Error::ResolutionFailed { .. }));
}

#[rstest]
#[case("sha256", 64)]
#[case("sha512", 128)]
fn configured_hash_algorithm_is_honoured(#[case] hash: &str, #[case] hex_len: usize) {
    let repo = two_level_repo();
    let (private, public) = key_pair(8);
    let keys = keys_for("release", private, public);

    let sign_opts = Options::new()
        .sign("release")
        .with_hash_algorithm(hash)
        .with_keys(keys.clone());
    let signed = cdsig::sign_component_version(&repo, "acme.org/app", "1.0.0", &sign_opts).unwrap();
    assert_eq!(signed.hash_algorithm, hash);
    assert_eq!(signed.value.len(), hex_len);

    let verify_opts = Options::new().with_signature_name("release").with_keys(keys);
    let verified =
        cdsig::verify_component_version(&repo, "acme.org/app", "1.0.0", &verify_opts).unwrap();
    assert_eq!(verified, signed);
}
