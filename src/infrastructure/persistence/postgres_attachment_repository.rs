use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::application::dto::AttachmentFilter;
use crate::application::ports::{AttachmentRepository, LifecycleToken, RepositoryError, TxScope};
use crate::domain::entities::{AttachmentMetadata, LogicalAttachment};
use crate::domain::value_objects::{
    AssetType, AttachmentId, FileId, LifecycleState, Tags, Visibility,
};

use super::connection::{map_insert_error, PgTransaction, ScopedConnection};
use super::entity_registry::{logical_attachment_descriptor, EntityDescriptor};

pub struct PostgresAttachmentRepository {
    pool: PgPool,
    entity: Arc<EntityDescriptor>,
}

impl PostgresAttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            entity: logical_attachment_descriptor(),
        }
    }
}

/// Append the filter's row predicates; pagination is left to the caller
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &AttachmentFilter) {
    builder.push(" WHERE TRUE");

    match filter.state {
        Some(LifecycleState::Live) => {
            builder.push(" AND deleted_at IS NULL");
        }
        Some(LifecycleState::SoftDeleted) => {
            builder.push(" AND deleted_at IS NOT NULL");
        }
        None => {}
    }
    if let Some(ids) = &filter.ids {
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        builder.push(" AND id = ANY(").push_bind(ids).push(")");
    }
    if let Some(file_id) = &filter.file_id {
        builder.push(" AND file_id = ").push_bind(*file_id.as_uuid());
    }
    if let Some(asset_type) = filter.asset_type {
        builder
            .push(" AND asset_type = ")
            .push_bind(asset_type.to_string());
    }
    if let Some(visibility) = filter.visibility {
        builder
            .push(" AND visibility = ")
            .push_bind(visibility.to_string());
    }
    if let Some(tag) = &filter.tag {
        builder.push(" AND tags @> ARRAY[").push_bind(tag.clone()).push("]");
    }
}

#[async_trait]
impl AttachmentRepository for PostgresAttachmentRepository {
    type Tx = PgTransaction;

    async fn insert(
        &self,
        _token: LifecycleToken,
        attachment: &LogicalAttachment,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<LogicalAttachment, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            r#"
            INSERT INTO {} (
                id, file_id, asset_type, title, description, tags, visibility,
                deleted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            self.entity.table,
            self.entity.select_list()
        );

        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(attachment.id().as_uuid())
            .bind(attachment.file_id().as_uuid())
            .bind(attachment.asset_type().to_string())
            .bind(attachment.title())
            .bind(attachment.description())
            .bind(attachment.tags().as_slice())
            .bind(attachment.visibility().to_string())
            .bind(attachment.deleted_at())
            .bind(attachment.created_at())
            .bind(attachment.updated_at())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_insert_error(e, None))?;

        row.into_domain()
    }

    async fn find_by_id(
        &self,
        id: &AttachmentId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!("{} WHERE id = $1", self.entity.select_from());

        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(AttachmentRow::into_domain).transpose()
    }

    async fn find(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Vec<LogicalAttachment>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;

        let mut builder = QueryBuilder::<Postgres>::new(self.entity.select_from());
        push_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at, id");
        if let Some(limit) = filter.effective_limit() {
            builder.push(" LIMIT ").push_bind(limit);
        }
        let offset = filter.effective_offset();
        if offset > 0 {
            builder.push(" OFFSET ").push_bind(offset);
        }

        let rows = builder
            .build_query_as::<AttachmentRow>()
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(AttachmentRow::into_domain).collect()
    }

    async fn count(
        &self,
        filter: &AttachmentFilter,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<i64, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;

        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", self.entity.table));
        push_conditions(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }

    async fn update_metadata(
        &self,
        id: &AttachmentId,
        metadata: &AttachmentMetadata,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            r#"
            UPDATE {}
            SET title = $2, description = $3, tags = $4, visibility = $5, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            self.entity.table,
            self.entity.select_list()
        );

        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(id.as_uuid())
            .bind(metadata.title.as_deref())
            .bind(metadata.description.as_deref())
            .bind(metadata.tags.as_slice())
            .bind(metadata.visibility.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(AttachmentRow::into_domain).transpose()
    }

    async fn mark_deleted(
        &self,
        _token: LifecycleToken,
        id: &AttachmentId,
        at: DateTime<Utc>,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            r#"
            UPDATE {}
            SET deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            self.entity.table,
            self.entity.select_list()
        );

        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(id.as_uuid())
            .bind(at)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(AttachmentRow::into_domain).transpose()
    }

    async fn mark_restored(
        &self,
        _token: LifecycleToken,
        id: &AttachmentId,
        at: DateTime<Utc>,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<LogicalAttachment>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            r#"
            UPDATE {}
            SET deleted_at = NULL, updated_at = $2
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING {}
            "#,
            self.entity.table,
            self.entity.select_list()
        );

        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(id.as_uuid())
            .bind(at)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(AttachmentRow::into_domain).transpose()
    }

    async fn count_live_by_file(
        &self,
        file_id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<i64, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE file_id = $1 AND deleted_at IS NULL",
            self.entity.table
        );

        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(file_id.as_uuid())
            .fetch_one(&mut *conn)
            .await?;

        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct AttachmentRow {
    id: uuid::Uuid,
    file_id: uuid::Uuid,
    asset_type: String,
    title: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    visibility: String,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AttachmentRow {
    fn into_domain(self) -> Result<LogicalAttachment, RepositoryError> {
        let asset_type = self
            .asset_type
            .parse::<AssetType>()
            .map_err(RepositoryError::SerializationError)?;

        let visibility = self
            .visibility
            .parse::<Visibility>()
            .map_err(RepositoryError::SerializationError)?;

        Ok(LogicalAttachment::reconstruct(
            AttachmentId::from_uuid(self.id),
            FileId::from_uuid(self.file_id),
            asset_type,
            AttachmentMetadata {
                title: self.title,
                description: self.description,
                tags: Tags::from_stored(self.tags),
                visibility,
            },
            self.deleted_at,
            self.created_at,
            self.updated_at,
        ))
    }
}
