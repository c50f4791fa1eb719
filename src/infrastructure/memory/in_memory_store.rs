use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::dto::AttachmentFilter;
use crate::application::ports::{
    AttachmentRepository, LifecycleToken, PhysicalFileRepository, RepositoryError, TxScope,
};
use crate::domain::entities::{AttachmentMetadata, LogicalAttachment, PhysicalFile};
use crate::domain::value_objects::{AttachmentId, Checksum, FileId, LifecycleState};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    files: HashMap<FileId, PhysicalFile>,
    checksums: HashMap<Checksum, FileId>,
    attachments: HashMap<AttachmentId, LogicalAttachment>,
}

/// Process-local backend implementing both repository ports
///
/// Clones share the same state. Transactions take the store lock for their whole
/// lifetime, so a task holding a [`MemoryTransaction`] must not issue
/// `TxScope::NoTransaction` calls against the same store until it commits or drops it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetStore {
    state: Arc<Mutex<MemoryState>>,
}

/// Staged copy of the store, written back on [`MemoryTransaction::commit`]
///
/// Dropping the transaction discards every staged write.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryTransaction {
    pub fn commit(self) {
        let MemoryTransaction { mut guard, staged } = self;
        *guard = staged;
    }

    pub fn rollback(self) {}
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction")
            .field("files", &self.staged.files.len())
            .field("attachments", &self.staged.attachments.len())
            .finish()
    }
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction, waiting for any other open transaction to finish
    pub async fn begin(&self) -> MemoryTransaction {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        MemoryTransaction { guard, staged }
    }

    async fn with_state<R, F>(&self, scope: TxScope<'_, MemoryTransaction>, f: F) -> R
    where
        F: FnOnce(&mut MemoryState) -> R + Send,
    {
        match scope {
            TxScope::NoTransaction => {
                let mut guard = self.state.lock().await;
                f(&mut guard)
            }
            TxScope::WithinTransaction(tx) => f(&mut tx.staged),
        }
    }
}

impl MemoryState {
    fn insert_file(&mut self, file: &PhysicalFile) -> Result<PhysicalFile, RepositoryError> {
        if self.checksums.contains_key(file.checksum()) {
            return Err(RepositoryError::DuplicateChecksum(file.checksum().to_string()));
        }
        self.checksums.insert(file.checksum().clone(), *file.id());
        self.files.insert(*file.id(), file.clone());
        Ok(file.clone())
    }

    fn apply_ref_delta(&mut self, id: &FileId, delta: i64) -> Option<PhysicalFile> {
        let file = self.files.get_mut(id)?;
        file.apply_ref_delta(delta, Utc::now());
        Some(file.clone())
    }

    fn transition<F>(&mut self, id: &AttachmentId, apply: F) -> Option<LogicalAttachment>
    where
        F: FnOnce(&mut LogicalAttachment) -> bool,
    {
        let attachment = self.attachments.get_mut(id)?;
        apply(attachment).then(|| attachment.clone())
    }

    fn sorted_matches(&self, filter: &AttachmentFilter) -> Vec<&LogicalAttachment> {
        let mut matched: Vec<&LogicalAttachment> = self
            .attachments
            .values()
            .filter(|attachment| filter.matches(attachment))
            .collect();
        matched.sort_by_key(|attachment| (attachment.created_at(), *attachment.id()));
        matched
    }
}

#[async_trait]
impl PhysicalFileRepository for InMemoryAssetStore {
    type Tx = MemoryTransaction;

    async fn insert(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<PhysicalFile, RepositoryError> {
        self.with_state(scope, |state| state.insert_file(file)).await
    }

    async fn insert_if_absent(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        self.with_state(scope, |state| match state.insert_file(file) {
            Ok(stored) => Ok(Some(stored)),
            Err(RepositoryError::DuplicateChecksum(_)) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| state.files.get(id).cloned())
            .await)
    }

    async fn find_by_checksum(
        &self,
        checksum: &Checksum,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| {
                state
                    .checksums
                    .get(checksum)
                    .and_then(|id| state.files.get(id))
                    .cloned()
            })
            .await)
    }

    async fn find_orphaned(
        &self,
        limit: i64,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Vec<PhysicalFile>, RepositoryError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .with_state(scope, |state| {
                let mut orphans: Vec<&PhysicalFile> =
                    state.files.values().filter(|f| f.is_orphaned()).collect();
                orphans.sort_by_key(|f| (f.created_at(), *f.id()));
                orphans.into_iter().take(limit).cloned().collect()
            })
            .await)
    }

    async fn increment_ref(
        &self,
        _token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<(), RepositoryError> {
        self.with_state(scope, |state| {
            state.apply_ref_delta(id, LifecycleState::Live.ref_delta())
        })
        .await;
        Ok(())
    }

    async fn decrement_ref(
        &self,
        _token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| {
                state.apply_ref_delta(id, LifecycleState::SoftDeleted.ref_delta())
            })
            .await)
    }
}

#[async_trait]
impl AttachmentRepository for InMemoryAssetStore {
    type Tx = MemoryTransaction;

    async fn insert(
        &self,
        _token: LifecycleToken,
        attachment: &LogicalAttachment,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<LogicalAttachment, RepositoryError> {
        self.with_state(scope, |state| {
            if !state.files.contains_key(attachment.file_id()) {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "physical file {} does not exist",
                    attachment.file_id()
                )));
            }
            state
                .attachments
                .insert(*attachment.id(), attachment.clone());
            Ok(attachment.clone())
        })
        .await
    }

    async fn find_by_id(
        &self,
        id: &AttachmentId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| state.attachments.get(id).cloned())
            .await)
    }

    async fn find(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Vec<LogicalAttachment>, RepositoryError> {
        let offset = usize::try_from(filter.effective_offset()).unwrap_or(0);
        let limit = filter
            .effective_limit()
            .map(|l| usize::try_from(l).unwrap_or(0))
            .unwrap_or(usize::MAX);

        Ok(self
            .with_state(scope, |state| {
                state
                    .sorted_matches(filter)
                    .into_iter()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .await)
    }

    async fn count(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .with_state(scope, |state| {
                state
                    .attachments
                    .values()
                    .filter(|attachment| filter.matches(attachment))
                    .count()
            })
            .await;
        i64::try_from(count).map_err(|e| RepositoryError::Internal(e.to_string()))
    }

    async fn update_metadata(
        &self,
        id: &AttachmentId,
        metadata: &AttachmentMetadata,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| {
                state.transition(id, |attachment| {
                    attachment.replace_metadata(metadata.clone(), Utc::now());
                    true
                })
            })
            .await)
    }

    async fn mark_deleted(
        &self,
        _token: LifecycleToken,
        id: &AttachmentId,
        at: DateTime<Utc>,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| {
                state.transition(id, |attachment| attachment.mark_deleted(at))
            })
            .await)
    }

    async fn mark_restored(
        &self,
        _token: LifecycleToken,
        id: &AttachmentId,
        at: DateTime<Utc>,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        Ok(self
            .with_state(scope, |state| {
                state.transition(id, |attachment| attachment.mark_restored(at))
            })
            .await)
    }

    async fn count_live_by_file(
        &self,
        file_id: &FileId,
        scope: TxScope<'_, MemoryTransaction>,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .with_state(scope, |state| {
                state
                    .attachments
                    .values()
                    .filter(|a| a.file_id() == file_id && a.is_live())
                    .count()
            })
            .await;
        i64::try_from(count).map_err(|e| RepositoryError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{AssetType, StorageProvider};

    fn file(seed: &[u8]) -> PhysicalFile {
        PhysicalFile::new(
            StorageProvider::Local,
            "docs/report.pdf".to_string(),
            "https://files.example.com/docs/report.pdf".to_string(),
            "application/pdf".to_string(),
            64,
            Checksum::compute(seed),
        )
    }

    #[tokio::test]
    async fn test_duplicate_checksum_is_rejected() {
        let store = InMemoryAssetStore::new();
        let first = file(b"same");
        PhysicalFileRepository::insert(&store, &first, TxScope::NoTransaction)
            .await
            .unwrap();

        let err = PhysicalFileRepository::insert(&store, &file(b"same"), TxScope::NoTransaction)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateChecksum(_)));

        let absent = store
            .insert_if_absent(&file(b"same"), TxScope::NoTransaction)
            .await
            .unwrap();
        assert!(absent.is_none());
    }

    #[tokio::test]
    async fn test_attachment_requires_existing_file() {
        let store = InMemoryAssetStore::new();
        let attachment =
            LogicalAttachment::new(FileId::new(), AssetType::Image, AttachmentMetadata::default());

        let err = AttachmentRepository::insert(
            &store,
            LifecycleToken::issue(),
            &attachment,
            TxScope::NoTransaction,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_conditional_transitions_match_once() {
        let store = InMemoryAssetStore::new();
        let stored = file(b"transitions");
        PhysicalFileRepository::insert(&store, &stored, TxScope::NoTransaction)
            .await
            .unwrap();
        let attachment =
            LogicalAttachment::new(*stored.id(), AssetType::Video, AttachmentMetadata::default());
        let token = LifecycleToken::issue();
        AttachmentRepository::insert(&store, token, &attachment, TxScope::NoTransaction)
            .await
            .unwrap();

        let now = Utc::now();
        assert!(store
            .mark_deleted(token, attachment.id(), now, TxScope::NoTransaction)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .mark_deleted(token, attachment.id(), now, TxScope::NoTransaction)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .mark_restored(token, attachment.id(), now, TxScope::NoTransaction)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = InMemoryAssetStore::new();

        let mut tx = store.begin().await;
        PhysicalFileRepository::insert(&store, &file(b"rolled back"), TxScope::WithinTransaction(&mut tx))
            .await
            .unwrap();
        tx.rollback();
        assert!(store
            .find_orphaned(10, TxScope::NoTransaction)
            .await
            .unwrap()
            .is_empty());

        let kept = file(b"committed");
        let mut tx = store.begin().await;
        PhysicalFileRepository::insert(&store, &kept, TxScope::WithinTransaction(&mut tx))
            .await
            .unwrap();
        store
            .increment_ref(LifecycleToken::issue(), kept.id(), TxScope::WithinTransaction(&mut tx))
            .await
            .unwrap();
        tx.commit();

        let found = PhysicalFileRepository::find_by_id(&store, kept.id(), TxScope::NoTransaction)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.ref_count(), 1);
    }

    #[tokio::test]
    async fn test_decrement_missing_file_returns_none() {
        let store = InMemoryAssetStore::new();
        let result = store
            .decrement_ref(LifecycleToken::issue(), &FileId::new(), TxScope::NoTransaction)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_counter_moves_by_state_delta() {
        let store = InMemoryAssetStore::new();
        let stored = file(b"delta");
        PhysicalFileRepository::insert(&store, &stored, TxScope::NoTransaction)
            .await
            .unwrap();
        let token = LifecycleToken::issue();

        store
            .increment_ref(token, stored.id(), TxScope::NoTransaction)
            .await
            .unwrap();
        let after = store
            .decrement_ref(token, stored.id(), TxScope::NoTransaction)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            after.ref_count(),
            LifecycleState::Live.ref_delta() + LifecycleState::SoftDeleted.ref_delta()
        );

        let negative = store
            .decrement_ref(token, stored.id(), TxScope::NoTransaction)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(negative.ref_count(), LifecycleState::SoftDeleted.ref_delta());
    }
}
