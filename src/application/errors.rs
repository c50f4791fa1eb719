//! Error type shared by the registry and attachment services
//!
//! Absence is never an error here: lookups and transitions report "not found"
//! and "already in the target state" as `Ok(None)`.

use thiserror::Error;

use crate::application::ports::RepositoryError;
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AssetError {
    /// True when a concurrent or repeated upload already registered the checksum
    pub fn is_duplicate_checksum(&self) -> bool {
        matches!(
            self,
            AssetError::Repository(RepositoryError::DuplicateChecksum(_))
        )
    }
}

impl From<validator::ValidationErrors> for AssetError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AssetError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_from_domain_error() {
        let err: AssetError = DomainError::InvalidTag("empty".to_string()).into();
        assert!(matches!(err, AssetError::Domain(_)));
        assert!(err.to_string().contains("Domain error"));
    }

    #[test]
    fn test_asset_error_from_repository_error() {
        let err: AssetError = RepositoryError::Internal("boom".to_string()).into();
        assert!(matches!(err, AssetError::Repository(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_is_duplicate_checksum() {
        let dup: AssetError = RepositoryError::DuplicateChecksum("ab".repeat(32)).into();
        assert!(dup.is_duplicate_checksum());

        let other = AssetError::Validation("title".to_string());
        assert!(!other.is_duplicate_checksum());
    }
}
