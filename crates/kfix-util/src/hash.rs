use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of a byte slice, returning a lowercase hex string.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// First `len` hex characters of the SHA-256 of `data`.
pub fn short_hash(data: &[u8], len: usize) -> String {
    let mut digest = sha256_bytes(data);
    digest.truncate(len);
    digest
}
