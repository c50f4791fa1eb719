use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use crate::application::dto::{NewPhysicalFile, MAX_PAGE_SIZE};
use crate::application::errors::AssetError;
use crate::application::ports::{PhysicalFileRepository, RepositoryError, TxScope};
use crate::domain::entities::PhysicalFile;
use crate::domain::errors::DomainError;
use crate::domain::value_objects::{Checksum, FileId};

/// Registry of checksum-deduplicated physical files
///
/// Registration never touches the reference counter; counters move only when
/// attachments are created, soft-deleted or restored.
pub struct PhysicalFileRegistry<R> {
    repo: Arc<R>,
}

impl<R> PhysicalFileRegistry<R>
where
    R: PhysicalFileRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Register a new upload. A second registration of the same checksum fails with
    /// a duplicate-checksum repository error.
    pub async fn register(
        &self,
        upload: NewPhysicalFile,
        scope: TxScope<'_, R::Tx>,
    ) -> Result<PhysicalFile, AssetError> {
        let file = build_file(upload)?;
        let stored = self.repo.insert(&file, scope).await?;

        info!(
            file_id = %stored.id(),
            checksum = %stored.checksum(),
            provider = %stored.storage_provider(),
            "Registered physical file"
        );
        Ok(stored)
    }

    /// Return the file already registered for this checksum, or register it.
    ///
    /// The flag is true when this call created the row.
    pub async fn resolve(
        &self,
        upload: NewPhysicalFile,
        mut scope: TxScope<'_, R::Tx>,
    ) -> Result<(PhysicalFile, bool), AssetError> {
        let file = build_file(upload)?;

        if let Some(existing) = self
            .repo
            .find_by_checksum(file.checksum(), scope.reborrow())
            .await?
        {
            debug!(file_id = %existing.id(), checksum = %existing.checksum(), "Reusing physical file");
            return Ok((existing, false));
        }

        if let Some(created) = self.repo.insert_if_absent(&file, scope.reborrow()).await? {
            info!(
                file_id = %created.id(),
                checksum = %created.checksum(),
                "Registered physical file"
            );
            return Ok((created, true));
        }

        // Another request registered the checksum between our read and insert
        let winner = self
            .repo
            .find_by_checksum(file.checksum(), scope)
            .await?
            .ok_or_else(|| {
                RepositoryError::Internal(format!(
                    "checksum {} conflicted but no row is visible",
                    file.checksum()
                ))
            })?;
        debug!(file_id = %winner.id(), "Lost registration race, reusing winner");
        Ok((winner, false))
    }

    pub async fn find_by_id(
        &self,
        id: &FileId,
        scope: TxScope<'_, R::Tx>,
    ) -> Result<Option<PhysicalFile>, AssetError> {
        Ok(self.repo.find_by_id(id, scope).await?)
    }

    pub async fn find_by_checksum(
        &self,
        checksum: &Checksum,
        scope: TxScope<'_, R::Tx>,
    ) -> Result<Option<PhysicalFile>, AssetError> {
        Ok(self.repo.find_by_checksum(checksum, scope).await?)
    }

    /// Files whose counter reached zero, at most `limit` clamped to `0..=MAX_PAGE_SIZE`.
    /// Deleting their bytes is the caller's call.
    pub async fn find_orphaned(
        &self,
        limit: i64,
        scope: TxScope<'_, R::Tx>,
    ) -> Result<Vec<PhysicalFile>, AssetError> {
        let limit = limit.clamp(0, MAX_PAGE_SIZE);
        Ok(self.repo.find_orphaned(limit, scope).await?)
    }
}

fn build_file(upload: NewPhysicalFile) -> Result<PhysicalFile, AssetError> {
    upload.validate()?;

    let checksum = Checksum::from_hex(upload.checksum)?;
    let file_size =
        u64::try_from(upload.file_size).map_err(|_| DomainError::InvalidFileSize(upload.file_size))?;

    Ok(PhysicalFile::new(
        upload.storage_provider,
        upload.object_key,
        upload.public_url,
        upload.content_type,
        file_size,
        checksum,
    ))
}
