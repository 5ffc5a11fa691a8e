use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::StudyRepository;

mod kv_store;
mod migrate;

/// Pool limits for the study database.
const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Applied to every pooled connection before it is handed out.
const CONNECTION_PRAGMAS: [&str; 2] = ["PRAGMA journal_mode = WAL;", "PRAGMA busy_timeout = 5000;"];

/// `KeyValueStore` over a `SQLite` database.
///
/// Every study document (card stats, session stats, settings, memos, custom cards) is one
/// row of the `kv_entries` table, keyed by its storage key with a JSON text value.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteStore {
    /// Open a connection pool on `database_url` without touching the schema.
    ///
    /// Call [`SqliteStore::migrate`] (or use [`SqliteStore::open`]) before reading
    /// entries, otherwise `kv_entries` may not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a connection
    /// pragma is rejected.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Connect and bring the `kv_entries` schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connecting or migrating fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let store = Self::connect(database_url).await?;
        store.migrate().await?;
        Ok(store)
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create `schema_migrations` and `kv_entries` if missing. Safe to run repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl StudyRepository {
    /// Study data persisted in the `SQLite` database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        Ok(Self::new(Arc::new(SqliteStore::open(database_url).await?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store_can_back_a_shared_repository() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteStore>();
    }

    #[tokio::test]
    async fn open_creates_kv_table_and_tolerates_rerun() {
        let store = SqliteStore::open("sqlite:file:memdb_open_kv?mode=memory&cache=shared")
            .await
            .unwrap();
        store.migrate().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries'",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();
        assert_eq!(tables.len(), 1);

        let versions: Vec<(i64,)> = sqlx::query_as("SELECT version FROM schema_migrations")
            .fetch_all(store.pool())
            .await
            .unwrap();
        assert_eq!(versions, vec![(1,)]);
    }
}
