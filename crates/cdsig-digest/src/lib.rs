//! Resource content digesting
//!
//! Resolves the content behind a resource's access specification and
//! computes the digest recorded in the component descriptor. Registry
//! and repository access is injected through the [`OciClient`] and
//! [`BlobResolver`] traits; only the S3 object fetch is performed
//! directly over HTTP.

pub mod digester;
pub mod error;
pub mod resolver;

pub use crate::digester::ResourceDigester;
pub use crate::error::{Error, Result};
pub use crate::resolver::{BlobInfo, BlobResolver, OciClient};
