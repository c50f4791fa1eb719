#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use asset_store::application::dto::NewPhysicalFile;
use asset_store::application::ports::{
    LifecycleToken, PhysicalFileRepository, RepositoryError, TxScope,
};
use asset_store::domain::entities::PhysicalFile;
use asset_store::domain::value_objects::{Checksum, FileId, StorageProvider};
use asset_store::infrastructure::memory::{InMemoryAssetStore, MemoryTransaction};

/// Upload description whose checksum is derived from `seed`
pub fn upload(seed: &str) -> NewPhysicalFile {
    NewPhysicalFile {
        storage_provider: StorageProvider::S3,
        object_key: format!("uploads/{seed}"),
        public_url: format!("https://cdn.example.com/uploads/{seed}"),
        content_type: "image/jpeg".to_string(),
        file_size: 1024,
        checksum: Checksum::compute(seed.as_bytes()).to_string(),
    }
}

/// File repository that can be told to fail its counter writes
pub struct FlakyCounters {
    pub inner: InMemoryAssetStore,
    pub should_fail_increment: AtomicBool,
    pub should_fail_decrement: AtomicBool,
}

impl FlakyCounters {
    pub fn new(inner: InMemoryAssetStore) -> Self {
        Self {
            inner,
            should_fail_increment: AtomicBool::new(false),
            should_fail_decrement: AtomicBool::new(false),
        }
    }

    pub fn fail_increments(&self, fail: bool) {
        self.should_fail_increment.store(fail, Ordering::SeqCst);
    }

    pub fn fail_decrements(&self, fail: bool) {
        self.should_fail_decrement.store(fail, Ordering::SeqCst);
    }
}

fn injected() -> RepositoryError {
    RepositoryError::Internal("injected counter failure".to_string())
}

#[async_trait]
impl PhysicalFileRepository for FlakyCounters {
    type Tx = MemoryTransaction;

    async fn insert(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<PhysicalFile, RepositoryError> {
        PhysicalFileRepository::insert(&self.inner, file, scope).await
    }

    async fn insert_if_absent(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        self.inner.insert_if_absent(file, scope).await
    }

    async fn find_by_id(
        &self,
        id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        PhysicalFileRepository::find_by_id(&self.inner, id, scope).await
    }

    async fn find_by_checksum(
        &self,
        checksum: &Checksum,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        self.inner.find_by_checksum(checksum, scope).await
    }

    async fn find_orphaned(
        &self,
        limit: i64,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Vec<PhysicalFile>, RepositoryError> {
        self.inner.find_orphaned(limit, scope).await
    }

    async fn increment_ref(
        &self,
        token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<(), RepositoryError> {
        if self.should_fail_increment.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.increment_ref(token, id, scope).await
    }

    async fn decrement_ref(
        &self,
        token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        if self.should_fail_decrement.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.decrement_ref(token, id, scope).await
    }
}
