use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::{Checksum, FileId, StorageProvider};

/// Physical file entity - one uploaded byte stream with a live reference count
///
/// The counter is only ever changed by the attachment lifecycle transitions;
/// there is no public setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalFile {
    id: FileId,
    storage_provider: StorageProvider,
    object_key: String,
    public_url: String,
    content_type: String,
    file_size: u64,
    checksum: Checksum,
    ref_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PhysicalFile {
    /// Create new registry entry with ref_count = 0
    pub(crate) fn new(
        storage_provider: StorageProvider,
        object_key: String,
        public_url: String,
        content_type: String,
        file_size: u64,
        checksum: Checksum,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FileId::new(),
            storage_provider,
            object_key,
            public_url,
            content_type,
            file_size,
            checksum,
            ref_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstruct from storage
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reconstruct(
        id: FileId,
        storage_provider: StorageProvider,
        object_key: String,
        public_url: String,
        content_type: String,
        file_size: u64,
        checksum: Checksum,
        ref_count: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            storage_provider,
            object_key,
            public_url,
            content_type,
            file_size,
            checksum,
            ref_count,
            created_at,
            updated_at,
        }
    }

    /// Apply an atomic counter change; no clamping
    pub(crate) fn apply_ref_delta(&mut self, delta: i64, at: DateTime<Utc>) {
        self.ref_count += delta;
        self.updated_at = at;
    }

    /// Check if no live attachment references this file
    pub fn is_orphaned(&self) -> bool {
        self.ref_count <= 0
    }

    // Getters
    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn storage_provider(&self) -> StorageProvider {
        self.storage_provider
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn ref_count(&self) -> i64 {
        self.ref_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_file() -> PhysicalFile {
        PhysicalFile::new(
            StorageProvider::S3,
            "tours/42/hero.jpg".to_string(),
            "https://cdn.example.com/tours/42/hero.jpg".to_string(),
            "image/jpeg".to_string(),
            2048,
            Checksum::compute(b"hero"),
        )
    }

    #[test]
    fn test_physical_file_new_starts_unreferenced() {
        let file = create_test_file();
        assert_eq!(file.ref_count(), 0);
        assert!(file.is_orphaned());
        assert_eq!(file.created_at(), file.updated_at());
    }

    #[test]
    fn test_apply_ref_delta() {
        let mut file = create_test_file();
        let later = file.updated_at() + chrono::Duration::seconds(5);

        file.apply_ref_delta(1, later);
        assert_eq!(file.ref_count(), 1);
        assert!(!file.is_orphaned());
        assert_eq!(file.updated_at(), later);

        file.apply_ref_delta(-1, later);
        assert_eq!(file.ref_count(), 0);
        assert!(file.is_orphaned());
    }

    #[test]
    fn test_apply_ref_delta_does_not_clamp() {
        let mut file = create_test_file();
        file.apply_ref_delta(-1, Utc::now());
        assert_eq!(file.ref_count(), -1);
        assert!(file.is_orphaned());
    }
}
