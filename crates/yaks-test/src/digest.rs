//! Change-detection fingerprint for Tests
//!
//! The digest covers the controller version and the test source. A finished
//! Test whose freshly computed digest differs from the stored one is
//! restarted, so both a spec edit and a controller upgrade re-run it.

use aws_lc_rs::digest;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use yaks_common::crd::SourceSpec;

/// Leading marker; a computed digest is never empty
pub const DIGEST_PREFIX: char = 'v';

/// SHA-256 over `version ∥ language ∥ content ∥ name`, base64url without
/// padding, prefixed with [`DIGEST_PREFIX`].
pub fn compute_digest(source: &SourceSpec, controller_version: &str) -> String {
    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(controller_version.as_bytes());
    ctx.update(source.language.as_str().as_bytes());
    ctx.update(source.content.as_bytes());
    ctx.update(source.name.as_bytes());
    let hash = ctx.finish();

    let mut out = String::with_capacity(1 + 43);
    out.push(DIGEST_PREFIX);
    out.push_str(&URL_SAFE_NO_PAD.encode(hash.as_ref()));
    out
}
