use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid checksum: expected {expected}, got {actual}")]
    InvalidChecksum { expected: String, actual: String },

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Too many tags: {count} > {max}")]
    TooManyTags { count: usize, max: usize },

    #[error("Invalid file size: {0}")]
    InvalidFileSize(i64),
}
