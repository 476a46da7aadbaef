//! Element identifiers
//!
//! An [`Oid`] is embedded in source as `data-oid="…"` on the element it
//! identifies. Uniqueness is checked by the caller against whatever set of
//! identifiers is in scope; generation itself is purely random.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

/// Alphabet identifiers are drawn from
pub const OID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a generated identifier
pub const OID_LENGTH: usize = 7;

/// Element identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a random identifier
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let value: String = (0..OID_LENGTH)
            .map(|_| OID_ALPHABET[rng.random_range(0..OID_ALPHABET.len())] as char)
            .collect();
        Self(value)
    }

    /// Generate until `taken` rejects nothing
    #[must_use]
    pub fn generate_unique(taken: impl Fn(&Oid) -> bool) -> Self {
        loop {
            let candidate = Self::generate();
            if !taken(&candidate) {
                return candidate;
            }
        }
    }

    /// Whether a raw attribute value can be kept as an identifier
    ///
    /// Values that would need escaping inside a string literal are refused
    /// so they are replaced rather than carried forward.
    #[must_use]
    pub fn is_acceptable(value: &str) -> bool {
        !value.is_empty()
            && value
                .chars()
                .all(|c| !c.is_whitespace() && !matches!(c, '"' | '\'' | '\\' | '{' | '}' | '<' | '>'))
    }

    /// Identifier as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Oid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Oid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn generated_shape() {
        let oid = Oid::generate();
        assert_eq!(oid.as_str().len(), OID_LENGTH);
        assert!(oid.as_str().bytes().all(|b| OID_ALPHABET.contains(&b)));
    }

    #[test]
    fn generate_unique_skips_taken() {
        let taken: HashSet<Oid> = (0..50).map(|_| Oid::generate()).collect();
        let fresh = Oid::generate_unique(|c| taken.contains(c));
        assert!(!taken.contains(&fresh));
    }

    #[test]
    fn acceptable_values() {
        assert!(Oid::is_acceptable("dup123"));
        assert!(!Oid::is_acceptable(""));
        assert!(!Oid::is_acceptable("has space"));
        assert!(!Oid::is_acceptable("q\"uote"));
    }

    proptest! {
        #[test]
        fn generated_values_are_always_acceptable(_seed in 0u32..256) {
            let oid = Oid::generate();
            prop_assert!(Oid::is_acceptable(oid.as_str()));
        }
    }
}
