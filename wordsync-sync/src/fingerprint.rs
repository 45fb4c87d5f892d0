//! Content fingerprinting for resources.
//!
//! Resources travel base64-encoded, and the remote manifest reports the hex
//! MD5 of that base64 text. The local fingerprint is computed the same way so
//! the two compare directly.

use base64::{engine::general_purpose::STANDARD, Engine};
use md5::{Digest, Md5};

/// A resource payload ready for transport, with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResource {
    /// Base64 (standard alphabet, padded) of the raw bytes.
    pub content: String,
    /// Lowercase hex digest of `content`.
    pub checksum: String,
}

/// Encode `bytes` for transport and fingerprint the encoding.
pub fn encode(bytes: &[u8]) -> EncodedResource {
    let content = STANDARD.encode(bytes);
    let checksum = checksum(&content);
    EncodedResource { content, checksum }
}

/// Fingerprint of raw resource bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    encode(bytes).checksum
}

/// Digest of already-encoded content.
pub fn checksum(encoded: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(encoded.as_bytes());
    hex::encode(hasher.finalize())
}
