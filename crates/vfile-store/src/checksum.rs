//! Content checksums
//!
//! Provides [`Checksum`], a strongly-typed 32-byte Blake3 digest stored
//! alongside every [`ContentEntry`](crate::ContentEntry). The checksum lets a
//! reader confirm that the bytes it received are the bytes that were
//! registered, and backs the optional content-hash deduplication policy.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content checksum (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Create a checksum from raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the checksum of a payload
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Get reference to the underlying digest
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check a payload against this checksum
    #[inline]
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Checksum {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ChecksumError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }
}

impl serde::Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing a checksum
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// Invalid digest length
    #[error("invalid checksum length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex decoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(Checksum::compute(b"hello world"), Checksum::compute(b"hello world"));
        assert_ne!(Checksum::compute(b"data1"), Checksum::compute(b"data2"));
    }

    #[test]
    fn matches_detects_tampering() {
        let sum = Checksum::compute(b"%PDF-1.4");
        assert!(sum.matches(b"%PDF-1.4"));
        assert!(!sum.matches(b"%PDF-1.5"));
    }

    #[test]
    fn display_and_parse() {
        let sum = Checksum::compute(b"test");
        let parsed: Checksum = sum.to_string().parse().unwrap();
        assert_eq!(sum, parsed);
        assert!(sum.to_string().starts_with(&sum.short()));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "abcd".parse::<Checksum>().unwrap_err();
        assert!(matches!(err, ChecksumError::InvalidLength { expected: 32, actual: 2 }));
    }

    #[test]
    fn serde_uses_hex_string() {
        let sum = Checksum::compute(b"test");
        let json = serde_json::to_string(&sum).unwrap();
        assert_eq!(json, format!("\"{sum}\""));
        let decoded: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(sum, decoded);
    }
}
