use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{KeyValueStore, StorageError};

use super::SqliteStore;

fn connection_error(err: sqlx::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(connection_error)?;

        row.map(|row| {
            row.try_get::<String, _>("value")
                .map_err(|err| StorageError::Serialization(err.to_string()))
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(connection_error)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(connection_error)?;
        Ok(())
    }

    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, String)>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT key, value
            FROM kv_entries
            WHERE key LIKE ?1 ESCAPE '\'
            ORDER BY key ASC
            ",
        )
        .bind(like_prefix(prefix))
        .fetch_all(&self.pool)
        .await
        .map_err(connection_error)?;

        rows.into_iter()
            .map(|row| {
                let key: String = row
                    .try_get("key")
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                let value: String = row
                    .try_get("value")
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                Ok((key, value))
            })
            // LIKE is case-insensitive for ASCII in SQLite
            .filter(|entry| entry.as_ref().map_or(true, |(key, _)| key.starts_with(prefix)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("stats_"), "stats\\_%");
        assert_eq!(like_prefix("100%"), "100\\%%");
        assert_eq!(like_prefix(r"a\b"), r"a\\b%");
    }
}
