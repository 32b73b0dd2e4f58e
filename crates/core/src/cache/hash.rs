//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the fingerprint of a content locator.
///
/// SHA-256 of the locator bytes, lowercase hex. Stable across processes, so
/// it also names the on-disk files of the directory adapter.
pub fn fingerprint(locator: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(locator.as_bytes());
    hex::encode(hasher.finalize())
}
