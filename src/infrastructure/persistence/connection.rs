use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::application::ports::{RepositoryError, TxScope};
use crate::domain::value_objects::Checksum;

/// Transaction handle the PostgreSQL repositories accept in `TxScope::WithinTransaction`
pub type PgTransaction = sqlx::Transaction<'static, Postgres>;

/// Connection for one repository call: borrowed from the caller's transaction, or
/// checked out of the pool for a standalone statement
pub(crate) enum ScopedConnection<'a> {
    Pooled(PoolConnection<Postgres>),
    Borrowed(&'a mut PgConnection),
}

impl<'a> ScopedConnection<'a> {
    pub(crate) async fn open(
        pool: &PgPool,
        scope: TxScope<'a, PgTransaction>,
    ) -> Result<Self, RepositoryError> {
        match scope {
            TxScope::NoTransaction => Ok(Self::Pooled(pool.acquire().await?)),
            TxScope::WithinTransaction(tx) => Ok(Self::Borrowed(&mut **tx)),
        }
    }
}

impl Deref for ScopedConnection<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Self::Pooled(conn) => conn,
            Self::Borrowed(conn) => conn,
        }
    }
}

impl DerefMut for ScopedConnection<'_> {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Self::Pooled(conn) => conn,
            Self::Borrowed(conn) => conn,
        }
    }
}

/// Map constraint failures on insert to their repository meaning
pub(crate) fn map_insert_error(err: sqlx::Error, checksum: Option<&Checksum>) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() && db.constraint() == Some("physical_files_checksum_key") {
            let checksum = checksum.map_or_else(|| db.message().to_string(), ToString::to_string);
            return RepositoryError::DuplicateChecksum(checksum);
        }
        if db.is_foreign_key_violation() || db.is_check_violation() {
            return RepositoryError::ConstraintViolation(db.message().to_string());
        }
    }
    RepositoryError::Database(err)
}
