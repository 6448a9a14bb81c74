//! Core types and wire format for signed component descriptors
//!
//! This crate provides the fundamental data structures shared by the
//! digesting, signing and verification engine: the component descriptor
//! schema, the polymorphic resource access specification, digest and
//! signature metadata, and the small support types (versioned element
//! keys, cancellation token) threaded through the recursive walk.

pub mod access;
pub mod cancel;
pub mod descriptor;
pub mod digest;
pub mod error;
pub mod signature;

pub use access::AccessSpec;
pub use cancel::CancelToken;
pub use descriptor::{
    ComponentDescriptor, ComponentReference, ComponentSpec, ExtraIdentity, Metadata, NameVersion,
    Resource, Source, SCHEMA_VERSION_V2,
};
pub use digest::{
    ArtifactDigest, DigestSpec, DigesterType, NestedComponentDigests, EXCLUDE_FROM_SIGNATURE,
    GENERIC_BLOB_DIGEST_V1, JSON_NORMALISATION_V1, NO_DIGEST, OCI_ARTIFACT_DIGEST_V1,
};
pub use error::{Error, Result};
pub use signature::{
    Signature, SignatureSpec, TimestampSpec, MEDIA_TYPE_PEM, MEDIA_TYPE_RSA_SIGNATURE,
    RSA_PKCS1_V15, SIGNATURE_ALGORITHM_HEADER, SIGNATURE_PEM_BLOCK_TYPE,
};
