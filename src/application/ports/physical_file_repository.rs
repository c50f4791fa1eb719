use async_trait::async_trait;

use crate::domain::entities::PhysicalFile;
use crate::domain::value_objects::{Checksum, FileId};

use super::{LifecycleToken, RepositoryError, TxScope};

/// Port for physical file registry persistence and reference counting
#[async_trait]
pub trait PhysicalFileRepository: Send + Sync {
    /// Transaction handle threaded through `TxScope::WithinTransaction`
    type Tx: Send + 'static;

    /// Insert a new entry; fails with `DuplicateChecksum` if the checksum exists
    async fn insert(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<PhysicalFile, RepositoryError>;

    /// Insert unless the checksum exists; `None` when another row already owns it
    async fn insert_if_absent(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError>;

    async fn find_by_id(
        &self,
        id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError>;

    async fn find_by_checksum(
        &self,
        checksum: &Checksum,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError>;

    /// Files with no live references, oldest first
    async fn find_orphaned(
        &self,
        limit: i64,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Vec<PhysicalFile>, RepositoryError>;

    /// Atomically add 1 to the counter. Matching no row is not an error.
    async fn increment_ref(
        &self,
        token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<(), RepositoryError>;

    /// Atomically subtract 1 and return the post-update row (`None` if no row matched)
    async fn decrement_ref(
        &self,
        token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError>;
}
