use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::errors::DomainError;

/// SHA-256 content checksum (32 bytes = 64 hex chars)
///
/// The checksum is the deduplication key of a physical file: two uploads of
/// identical bytes resolve to the same registry row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Create from validated hex string
    pub fn from_hex(hex: String) -> Result<Self, DomainError> {
        if hex.len() != 64 {
            return Err(DomainError::InvalidChecksum {
                expected: "64 hex characters".to_string(),
                actual: format!("{} characters", hex.len()),
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidChecksum {
                expected: "hex characters only".to_string(),
                actual: hex,
            });
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Compute the checksum of an in-memory byte buffer
    pub fn compute(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Get hex string representation
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Checksum {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.to_string())
    }
}

impl TryFrom<String> for Checksum {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(value)
    }
}

impl From<Checksum> for String {
    fn from(checksum: Checksum) -> Self {
        checksum.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_checksum_from_hex_valid() {
        let hex = "a".repeat(64);
        let checksum = Checksum::from_hex(hex.clone()).unwrap();
        assert_eq!(checksum.as_hex(), hex);
    }

    #[test]
    fn test_checksum_from_hex_lowercases() {
        let checksum = Checksum::from_hex("AB".repeat(32)).unwrap();
        assert_eq!(checksum.as_hex(), "ab".repeat(32));
    }

    #[test]
    fn test_checksum_from_hex_invalid_length() {
        let err = Checksum::from_hex("a".repeat(63)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidChecksum { .. }));
    }

    #[test]
    fn test_checksum_from_hex_invalid_chars() {
        let err = Checksum::from_hex("g".repeat(64)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidChecksum { .. }));
    }

    #[test]
    fn test_checksum_compute_known_vector() {
        let checksum = Checksum::compute(b"hello world");
        assert_eq!(
            checksum.as_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_identical_bytes_share_checksum() {
        assert_eq!(Checksum::compute(b"same"), Checksum::compute(b"same"));
        assert_ne!(Checksum::compute(b"same"), Checksum::compute(b"other"));
    }

    #[test]
    fn test_checksum_from_str_and_display() {
        let hex = "c".repeat(64);
        let checksum = Checksum::from_str(&hex).unwrap();
        assert_eq!(format!("{}", checksum), hex);
    }

    #[test]
    fn test_checksum_deserialize_rejects_invalid() {
        let result: Result<Checksum, _> = serde_json::from_str("\"not-a-checksum\"");
        assert!(result.is_err());
    }
}
