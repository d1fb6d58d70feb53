use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::{QuizSnapshot, SessionKey};
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{SnapshotRepository, StorageError, decode_snapshot, encode_snapshot};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    /// Store a raw payload under `key`, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the write fails.
    pub async fn insert_raw(&self, key: &SessionKey, payload: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO quiz_snapshots (key, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key.storage_key())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn load_snapshot(&self, key: &SessionKey) -> Result<Option<QuizSnapshot>, StorageError> {
        let row = sqlx::query("SELECT payload FROM quiz_snapshots WHERE key = ?1")
            .bind(key.storage_key())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row
            .try_get("payload")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        decode_snapshot(&payload).map(Some)
    }

    async fn save_snapshot(
        &self,
        key: &SessionKey,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError> {
        let payload = encode_snapshot(snapshot)?;
        self.insert_raw(key, &payload).await
    }

    async fn delete_snapshot(&self, key: &SessionKey) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM quiz_snapshots WHERE key = ?1")
            .bind(key.storage_key())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }
}
