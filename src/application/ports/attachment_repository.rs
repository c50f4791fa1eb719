use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::dto::AttachmentFilter;
use crate::domain::entities::{AttachmentMetadata, LogicalAttachment};
use crate::domain::value_objects::{AttachmentId, FileId};

use super::{LifecycleToken, RepositoryError, TxScope};

/// Port for logical attachment persistence
///
/// The lifecycle writes are conditional on the row's current state so that a
/// transition is observed at most once, even when two callers race.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    type Tx: Send + 'static;

    /// Insert a Live attachment; a dangling file reference is a `ConstraintViolation`
    async fn insert(
        &self,
        token: LifecycleToken,
        attachment: &LogicalAttachment,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<LogicalAttachment, RepositoryError>;

    /// Find by id regardless of lifecycle state
    async fn find_by_id(
        &self,
        id: &AttachmentId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError>;

    /// Rows matching the filter, oldest first, paginated
    async fn find(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Vec<LogicalAttachment>, RepositoryError>;

    /// Count rows matching the filter, ignoring pagination
    async fn count(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<i64, RepositoryError>;

    async fn update_metadata(
        &self,
        id: &AttachmentId,
        metadata: &AttachmentMetadata,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError>;

    /// Live -> SoftDeleted; `None` when no Live row with this id exists
    async fn mark_deleted(
        &self,
        token: LifecycleToken,
        id: &AttachmentId,
        at: DateTime<Utc>,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError>;

    /// SoftDeleted -> Live; `None` when no SoftDeleted row with this id exists
    async fn mark_restored(
        &self,
        token: LifecycleToken,
        id: &AttachmentId,
        at: DateTime<Utc>,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError>;

    async fn count_live_by_file(
        &self,
        file_id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<i64, RepositoryError>;
}
