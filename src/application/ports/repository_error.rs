use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying store error, passed through unmodified
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("A physical file with checksum {0} already exists")]
    DuplicateChecksum(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
