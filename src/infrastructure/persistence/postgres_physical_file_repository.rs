use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::application::dto::{RefCountReport, MAX_PAGE_SIZE};
use crate::application::ports::{LifecycleToken, PhysicalFileRepository, RepositoryError, TxScope};
use crate::domain::entities::PhysicalFile;
use crate::domain::value_objects::{Checksum, FileId, StorageProvider};

use super::connection::{map_insert_error, PgTransaction, ScopedConnection};
use super::entity_registry::{
    logical_attachment_descriptor, physical_file_descriptor, EntityDescriptor,
};

pub struct PostgresPhysicalFileRepository {
    pool: PgPool,
    entity: Arc<EntityDescriptor>,
    attachments: Arc<EntityDescriptor>,
}

impl PostgresPhysicalFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            entity: physical_file_descriptor(),
            attachments: logical_attachment_descriptor(),
        }
    }

    fn insert_sql(&self, on_conflict: &str) -> String {
        format!(
            r#"
            INSERT INTO {} (
                id, storage_provider, object_key, public_url, content_type,
                file_size, checksum, ref_count, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            {}
            RETURNING {}
            "#,
            self.entity.table,
            on_conflict,
            self.entity.select_list()
        )
    }

    fn ref_count_report_sql(&self) -> String {
        format!(
            r#"
            SELECT f.id, f.ref_count, COUNT(a.id) AS live
            FROM {} f
            LEFT JOIN {} a
                ON a.file_id = f.id AND a.deleted_at IS NULL
            GROUP BY f.id, f.ref_count
            HAVING NOT $1 OR f.ref_count <> COUNT(a.id)
            ORDER BY f.id
            LIMIT $2
            "#,
            self.entity.table, self.attachments.table
        )
    }

    /// Counter-versus-live-attachment comparison across the registry.
    ///
    /// Read-only. With `drifted_only` the result holds only inconsistent files.
    /// `limit` is clamped to `0..=MAX_PAGE_SIZE`.
    pub async fn ref_count_reports(
        &self,
        drifted_only: bool,
        limit: i64,
    ) -> Result<Vec<RefCountReport>, RepositoryError> {
        let sql = self.ref_count_report_sql();
        let rows = sqlx::query_as::<_, (uuid::Uuid, i64, i64)>(&sql)
            .bind(drifted_only)
            .bind(limit.clamp(0, MAX_PAGE_SIZE))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, recorded, live)| RefCountReport {
                file_id: FileId::from_uuid(id),
                recorded,
                live,
            })
            .collect())
    }
}

#[async_trait]
impl PhysicalFileRepository for PostgresPhysicalFileRepository {
    type Tx = PgTransaction;

    async fn insert(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<PhysicalFile, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = self.insert_sql("");
        let file_size = file_size_param(file)?;

        let row = bind_file(sqlx::query_as::<_, PhysicalFileRow>(&sql), file, file_size)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_insert_error(e, Some(file.checksum())))?;

        row.into_domain()
    }

    async fn insert_if_absent(
        &self,
        file: &PhysicalFile,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = self.insert_sql("ON CONFLICT (checksum) DO NOTHING");
        let file_size = file_size_param(file)?;

        let row = bind_file(sqlx::query_as::<_, PhysicalFileRow>(&sql), file, file_size)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_insert_error(e, Some(file.checksum())))?;

        row.map(PhysicalFileRow::into_domain).transpose()
    }

    async fn find_by_id(
        &self,
        id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!("{} WHERE id = $1", self.entity.select_from());

        let row = sqlx::query_as::<_, PhysicalFileRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(PhysicalFileRow::into_domain).transpose()
    }

    async fn find_by_checksum(
        &self,
        checksum: &Checksum,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!("{} WHERE checksum = $1", self.entity.select_from());

        let row = sqlx::query_as::<_, PhysicalFileRow>(&sql)
            .bind(checksum.as_hex())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(PhysicalFileRow::into_domain).transpose()
    }

    async fn find_orphaned(
        &self,
        limit: i64,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Vec<PhysicalFile>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            "{} WHERE ref_count <= 0 ORDER BY created_at, id LIMIT $1",
            self.entity.select_from()
        );

        let rows = sqlx::query_as::<_, PhysicalFileRow>(&sql)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(PhysicalFileRow::into_domain).collect()
    }

    async fn increment_ref(
        &self,
        _token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<(), RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            "UPDATE {} SET ref_count = ref_count + 1, updated_at = now() WHERE id = $1",
            self.entity.table
        );

        sqlx::query(&sql)
            .bind(id.as_uuid())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn decrement_ref(
        &self,
        _token: LifecycleToken,
        id: &FileId,
        scope: TxScope<'_, Self::Tx>,
    ) -> Result<Option<PhysicalFile>, RepositoryError> {
        let mut conn = ScopedConnection::open(&self.pool, scope).await?;
        let sql = format!(
            r#"
            UPDATE {}
            SET ref_count = ref_count - 1, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            self.entity.table,
            self.entity.select_list()
        );

        let row = sqlx::query_as::<_, PhysicalFileRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(PhysicalFileRow::into_domain).transpose()
    }
}

/// `BIGINT` value for the file size; sizes past `i64::MAX` cannot be stored
fn file_size_param(file: &PhysicalFile) -> Result<i64, RepositoryError> {
    i64::try_from(file.file_size()).map_err(|_| {
        RepositoryError::SerializationError(format!("Invalid file_size: {}", file.file_size()))
    })
}

fn bind_file<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, PhysicalFileRow, sqlx::postgres::PgArguments>,
    file: &'q PhysicalFile,
    file_size: i64,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, PhysicalFileRow, sqlx::postgres::PgArguments> {
    query
        .bind(file.id().as_uuid())
        .bind(file.storage_provider().to_string())
        .bind(file.object_key())
        .bind(file.public_url())
        .bind(file.content_type())
        .bind(file_size)
        .bind(file.checksum().as_hex())
        .bind(file.ref_count())
        .bind(file.created_at())
        .bind(file.updated_at())
}

// Internal row mapping struct
#[derive(sqlx::FromRow)]
struct PhysicalFileRow {
    id: uuid::Uuid,
    storage_provider: String,
    object_key: String,
    public_url: String,
    content_type: String,
    file_size: i64,
    checksum: String,
    ref_count: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl PhysicalFileRow {
    fn into_domain(self) -> Result<PhysicalFile, RepositoryError> {
        let storage_provider = self
            .storage_provider
            .parse::<StorageProvider>()
            .map_err(RepositoryError::SerializationError)?;

        let checksum = Checksum::from_hex(self.checksum)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        let file_size = u64::try_from(self.file_size).map_err(|_| {
            RepositoryError::SerializationError(format!("Invalid file_size: {}", self.file_size))
        })?;

        Ok(PhysicalFile::reconstruct(
            FileId::from_uuid(self.id),
            storage_provider,
            self.object_key,
            self.public_url,
            self.content_type,
            file_size,
            checksum,
            self.ref_count,
            self.created_at,
            self.updated_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_of_size(file_size: u64) -> PhysicalFile {
        PhysicalFile::new(
            StorageProvider::Gcs,
            "media/clip.mp4".to_string(),
            "https://storage.example.com/media/clip.mp4".to_string(),
            "video/mp4".to_string(),
            file_size,
            Checksum::compute(b"clip"),
        )
    }

    #[test]
    fn test_file_size_param_rejects_sizes_beyond_bigint() {
        assert_eq!(file_size_param(&file_of_size(4096)).unwrap(), 4096);
        assert_eq!(
            file_size_param(&file_of_size(i64::MAX as u64)).unwrap(),
            i64::MAX
        );

        let err = file_size_param(&file_of_size(u64::MAX)).unwrap_err();
        assert!(matches!(err, RepositoryError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_report_sql_uses_registered_tables() {
        let pool = PgPool::connect_lazy("postgres://localhost/asset_store").unwrap();
        let repo = PostgresPhysicalFileRepository::new(pool);

        let sql = repo.ref_count_report_sql();
        assert!(sql.contains(&format!("FROM {} f", physical_file_descriptor().table)));
        assert!(sql.contains(&format!(
            "LEFT JOIN {} a",
            logical_attachment_descriptor().table
        )));
    }
}
