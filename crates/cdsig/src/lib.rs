//! Recursive digesting, signing and verification of component
//! descriptors.
//!
//! The engine walks the reference graph of a component version depth
//! first: resources are digested from their content, references from
//! the descriptors they point to, and the resulting descriptor is
//! hashed over its normalised form. A signature covers that final hash,
//! so it transitively covers every artifact in the closure.
//!
//! ```no_run
//! # fn example(resolver: &dyn cdsig::ComponentVersionResolver) -> cdsig::Result<()> {
//! use cdsig::Options;
//!
//! let opts = Options::new().sign("acme-release").recursive();
//! let digest = cdsig::sign_component_version(resolver, "acme.org/app", "1.0.0", &opts)?;
//! println!("signed: {digest}");
//! # Ok(())
//! # }
//! ```

mod context;
mod digests;
mod error;
mod options;
mod resolver;
mod verify;
mod walk;

pub use crate::digests::add_digests_to_component_descriptor;
pub use crate::error::{Error, Result};
pub use crate::options::{DigestMode, Options};
pub use crate::resolver::{ComponentVersionAccess, ComponentVersionResolver};

use cdsig_types::{DigestSpec, NameVersion};

use crate::walk::Walker;

/// Digest a component version and everything it references.
///
/// Signing and verification are governed by the options; the returned
/// digest is the descriptor digest of the requested root. With the
/// update option (implied by signing) the results are written back
/// through the resolver.
pub fn apply(
    resolver: &dyn ComponentVersionResolver,
    name: &str,
    version: &str,
    opts: &Options,
) -> Result<DigestSpec> {
    opts.check_cancelled(&NameVersion::new(name, version))?;
    let mut cv = resolver.lookup(name, version)?;
    let mut walker = Walker::new(resolver);
    let r = walker.apply(cv.as_mut(), opts, None)?;
    walker
        .state
        .ctx(&r)
        .digest
        .clone()
        .ok_or_else(|| Error::MissingDigest {
            component: r.nv.clone(),
            what: "component descriptor".to_string(),
        })
}

/// Sign a component version. The options must carry a signature name;
/// a private key for that name must be registered.
pub fn sign_component_version(
    resolver: &dyn ComponentVersionResolver,
    name: &str,
    version: &str,
    opts: &Options,
) -> Result<DigestSpec> {
    if !opts.do_sign() {
        return Err(Error::InvalidOptions(
            "signing requires a signer and a signature name".to_string(),
        ));
    }
    apply(resolver, name, version, opts)
}

/// Verify the signatures of a component version against its recalculated
/// digest closure.
pub fn verify_component_version(
    resolver: &dyn ComponentVersionResolver,
    name: &str,
    version: &str,
    opts: &Options,
) -> Result<DigestSpec> {
    let opts = opts.clone().verify();
    apply(resolver, name, version, &opts)
}
