use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::application::dto::{
    AttachmentFilter, NewAttachment, RefCountReport, UpdateAttachmentMetadata,
};
use crate::application::errors::AssetError;
use crate::application::ports::{
    AttachmentRepository, LifecycleToken, PhysicalFileRepository, TxScope,
};
use crate::domain::entities::{AttachmentMetadata, LogicalAttachment};
use crate::domain::value_objects::{AttachmentId, FileId, Tags};

/// Lifecycle of logical attachments and the reference counters they drive
///
/// Every change of an attachment's state is paired with exactly one counter
/// update on its physical file, issued in the same `TxScope`. The counter moves
/// only when the conditional state write actually matched a row, so repeated or
/// racing calls never double-count.
pub struct AttachmentStore<F, A> {
    files: Arc<F>,
    attachments: Arc<A>,
}

impl<R> AttachmentStore<R, R>
where
    R: PhysicalFileRepository + AttachmentRepository<Tx = <R as PhysicalFileRepository>::Tx>,
{
    /// Build a store over one backend implementing both ports
    pub fn shared(backend: Arc<R>) -> Self {
        Self {
            files: Arc::clone(&backend),
            attachments: backend,
        }
    }
}

impl<F, A> AttachmentStore<F, A>
where
    F: PhysicalFileRepository,
    A: AttachmentRepository<Tx = F::Tx>,
{
    pub fn new(files: Arc<F>, attachments: Arc<A>) -> Self {
        Self { files, attachments }
    }

    /// Create a Live attachment and count it against its file
    pub async fn create(
        &self,
        request: NewAttachment,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<LogicalAttachment, AssetError> {
        request.validate()?;

        let metadata = AttachmentMetadata {
            title: request.title,
            description: request.description,
            tags: Tags::new(request.tags)?,
            visibility: request.visibility,
        };
        let attachment = LogicalAttachment::new(request.file_id, request.asset_type, metadata);

        let token = LifecycleToken::issue();
        let stored = self
            .attachments
            .insert(token, &attachment, scope.reborrow())
            .await?;
        self.files
            .increment_ref(token, stored.file_id(), scope)
            .await?;

        debug!(
            attachment_id = %stored.id(),
            file_id = %stored.file_id(),
            asset_type = %stored.asset_type(),
            "Created attachment"
        );
        Ok(stored)
    }

    /// Soft-delete a loaded attachment.
    ///
    /// An attachment that is already SoftDeleted, or that a concurrent caller
    /// deleted first, comes back in its current state without touching the counter.
    /// `None` when the row no longer exists.
    pub async fn soft_delete(
        &self,
        attachment: &LogicalAttachment,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        if !attachment.is_live() {
            return Ok(Some(attachment.clone()));
        }

        match self.transition_to_deleted(attachment.id(), &mut scope).await? {
            Some(updated) => Ok(Some(updated)),
            None => Ok(self.attachments.find_by_id(attachment.id(), scope).await?),
        }
    }

    /// Restore a loaded attachment. Symmetric to [`AttachmentStore::soft_delete`].
    pub async fn restore(
        &self,
        attachment: &LogicalAttachment,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        if attachment.is_live() {
            return Ok(Some(attachment.clone()));
        }

        match self.transition_to_live(attachment.id(), &mut scope).await? {
            Some(updated) => Ok(Some(updated)),
            None => Ok(self.attachments.find_by_id(attachment.id(), scope).await?),
        }
    }

    /// `None` when no Live attachment with this id exists
    pub async fn soft_delete_by_id(
        &self,
        id: &AttachmentId,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        self.transition_to_deleted(id, &mut scope).await
    }

    /// `None` when no SoftDeleted attachment with this id exists
    pub async fn restore_by_id(
        &self,
        id: &AttachmentId,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        self.transition_to_live(id, &mut scope).await
    }

    /// Soft-delete every Live attachment matching the filter.
    ///
    /// Returns the attachments this call transitioned; rows a concurrent caller
    /// got to first are skipped.
    pub async fn soft_delete_many(
        &self,
        filter: &AttachmentFilter,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Vec<LogicalAttachment>, AssetError> {
        let candidates = self
            .attachments
            .find(&filter.clone().not_deleted(), scope.reborrow())
            .await?;

        let mut transitioned = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if let Some(updated) = self.transition_to_deleted(candidate.id(), &mut scope).await? {
                transitioned.push(updated);
            }
        }

        info!(
            matched = candidates.len(),
            deleted = transitioned.len(),
            "Batch soft delete finished"
        );
        Ok(transitioned)
    }

    /// Restore every SoftDeleted attachment matching the filter
    pub async fn restore_many(
        &self,
        filter: &AttachmentFilter,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Vec<LogicalAttachment>, AssetError> {
        let candidates = self
            .attachments
            .find(&filter.clone().deleted_only(), scope.reborrow())
            .await?;

        let mut transitioned = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if let Some(updated) = self.transition_to_live(candidate.id(), &mut scope).await? {
                transitioned.push(updated);
            }
        }

        info!(
            matched = candidates.len(),
            restored = transitioned.len(),
            "Batch restore finished"
        );
        Ok(transitioned)
    }

    /// Replace descriptive metadata. Never moves a counter.
    pub async fn update_metadata(
        &self,
        id: &AttachmentId,
        update: UpdateAttachmentMetadata,
        scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        update.validate()?;

        let metadata = AttachmentMetadata {
            title: update.title,
            description: update.description,
            tags: Tags::new(update.tags)?,
            visibility: update.visibility,
        };
        Ok(self.attachments.update_metadata(id, &metadata, scope).await?)
    }

    /// Find by id in any lifecycle state
    pub async fn find_by_id(
        &self,
        id: &AttachmentId,
        scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        Ok(self.attachments.find_by_id(id, scope).await?)
    }

    /// Find by id, hiding SoftDeleted attachments
    pub async fn find_live_by_id(
        &self,
        id: &AttachmentId,
        scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        let found = self.attachments.find_by_id(id, scope).await?;
        Ok(found.filter(LogicalAttachment::is_live))
    }

    pub async fn find(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, F::Tx>,
    ) -> Result<Vec<LogicalAttachment>, AssetError> {
        Ok(self.attachments.find(filter, scope).await?)
    }

    pub async fn count(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, F::Tx>,
    ) -> Result<i64, AssetError> {
        Ok(self.attachments.count(filter, scope).await?)
    }

    /// Compare a file's counter with its Live attachments. Reports only.
    pub async fn audit_ref_count(
        &self,
        file_id: &FileId,
        mut scope: TxScope<'_, F::Tx>,
    ) -> Result<Option<RefCountReport>, AssetError> {
        let Some(file) = self.files.find_by_id(file_id, scope.reborrow()).await? else {
            return Ok(None);
        };
        let live = self.attachments.count_live_by_file(file_id, scope).await?;

        let report = RefCountReport {
            file_id: *file_id,
            recorded: file.ref_count(),
            live,
        };
        if !report.is_consistent() {
            warn!(
                file_id = %file_id,
                recorded = report.recorded,
                live = report.live,
                drift = report.drift(),
                "Reference counter drift detected"
            );
        }
        Ok(Some(report))
    }

    async fn transition_to_deleted(
        &self,
        id: &AttachmentId,
        scope: &mut TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        let token = LifecycleToken::issue();
        let Some(updated) = self
            .attachments
            .mark_deleted(token, id, Utc::now(), scope.reborrow())
            .await?
        else {
            debug!(attachment_id = %id, "No live attachment to delete");
            return Ok(None);
        };

        match self
            .files
            .decrement_ref(token, updated.file_id(), scope.reborrow())
            .await?
        {
            Some(file) if file.ref_count() < 0 => warn!(
                attachment_id = %id,
                file_id = %file.id(),
                ref_count = file.ref_count(),
                "Reference counter went negative"
            ),
            Some(file) => debug!(
                attachment_id = %id,
                file_id = %file.id(),
                ref_count = file.ref_count(),
                "Soft-deleted attachment"
            ),
            None => warn!(
                attachment_id = %id,
                file_id = %updated.file_id(),
                "Decrement matched no physical file"
            ),
        }
        Ok(Some(updated))
    }

    async fn transition_to_live(
        &self,
        id: &AttachmentId,
        scope: &mut TxScope<'_, F::Tx>,
    ) -> Result<Option<LogicalAttachment>, AssetError> {
        let token = LifecycleToken::issue();
        let Some(updated) = self
            .attachments
            .mark_restored(token, id, Utc::now(), scope.reborrow())
            .await?
        else {
            debug!(attachment_id = %id, "No soft-deleted attachment to restore");
            return Ok(None);
        };

        self.files
            .increment_ref(token, updated.file_id(), scope.reborrow())
            .await?;
        debug!(
            attachment_id = %id,
            file_id = %updated.file_id(),
            "Restored attachment"
        );
        Ok(Some(updated))
    }
}
