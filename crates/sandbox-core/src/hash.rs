//! Content-addressed hashing primitives
//!
//! Provides [`ContentHash`], a 32-byte Blake3 hash used to key parsed
//! source files by what they contain.

use std::fmt::{self, Display, Formatter};

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Hash several parts with a separator so `("ab", "c")` and `("a", "bc")` differ
    #[must_use]
    pub fn compute_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self::new(*hasher.finalize().as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = ContentHash::compute(b"<div>Hi</div>");
        let b = ContentHash::compute(b"<div>Hi</div>");
        assert_eq!(a, b);
        assert_ne!(a, ContentHash::compute(b"<div>Ho</div>"));
    }

    #[test]
    fn parts_are_length_prefixed() {
        let a = ContentHash::compute_parts(&[b"ab", b"c"]);
        let b = ContentHash::compute_parts(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn short_is_sixteen_hex_chars() {
        let h = ContentHash::compute(b"x");
        assert_eq!(h.short().len(), 16);
        assert!(h.to_string().starts_with(&h.short()));
    }
}
