use async_trait::async_trait;
use quiz_core::model::{QuizSnapshot, SessionKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encode a snapshot into its durable JSON payload.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_snapshot(snapshot: &QuizSnapshot) -> Result<String, StorageError> {
    serde_json::to_string(snapshot).map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Decode a durable JSON payload back into a snapshot.
///
/// Only the JSON shape is checked here; structural consistency is the
/// session's concern.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for unreadable payloads.
pub fn decode_snapshot(payload: &str) -> Result<QuizSnapshot, StorageError> {
    serde_json::from_str(payload).map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Durable per-session slot holding the in-progress quiz snapshot.
///
/// Each `SessionKey` owns exactly one slot; writes replace it wholesale.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Fetch the snapshot stored for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored payload cannot be
    /// read, or other storage errors.
    async fn load_snapshot(&self, key: &SessionKey) -> Result<Option<QuizSnapshot>, StorageError>;

    /// Replace the snapshot stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_snapshot(
        &self,
        key: &SessionKey,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError>;

    /// Remove the slot for `key`. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be removed.
    async fn delete_snapshot(&self, key: &SessionKey) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Payloads are kept as encoded JSON so tests can plant unreadable entries.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw payload under `key`, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw(&self, key: &SessionKey, payload: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.storage_key(), payload.into());
        Ok(())
    }

    /// Raw payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw(&self, key: &SessionKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&key.storage_key()).cloned())
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn load_snapshot(&self, key: &SessionKey) -> Result<Option<QuizSnapshot>, StorageError> {
        self.raw(key)?
            .map(|payload| decode_snapshot(&payload))
            .transpose()
    }

    async fn save_snapshot(
        &self,
        key: &SessionKey,
        snapshot: &QuizSnapshot,
    ) -> Result<(), StorageError> {
        let payload = encode_snapshot(snapshot)?;
        self.insert_raw(key, payload)
    }

    async fn delete_snapshot(&self, key: &SessionKey) -> Result<bool, StorageError> {
        let mut guard = self
            .slots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.remove(&key.storage_key()).is_some())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub snapshots: Arc<dyn SnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(InMemoryRepository::new());
        Self { snapshots }
    }
}
