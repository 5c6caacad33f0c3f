//! Content digests used to verify fallback moves.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::spec::TreeError;

/// Opaque checksum capability: same bytes, same string.
pub trait ContentDigest {
    fn compute_digest(&self, bytes: &[u8]) -> String;
}

/// Lowercase hex SHA-256.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl ContentDigest for Sha256Digest {
    fn compute_digest(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}

/// Digest of a whole file's contents.
pub fn digest_file<P: AsRef<Path>>(
    path: P,
    digest: &dyn ContentDigest,
) -> Result<String, TreeError> {
    let path = path.as_ref();
    let buf_content = fs::read(path).map_err(|e| TreeError::io(path, e))?;
    Ok(digest.compute_digest(&buf_content))
}
