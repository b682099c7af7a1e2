use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use course_core::model::ProgressDraft;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the single learner-progress slot.
///
/// The store holds at most one serialized record, addressed by a fixed
/// key; `save` replaces it atomically. There is no partial-write mode and
/// no multi-record API.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the persisted progress draft, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` when a slot exists but its
    /// body cannot be decoded, and `StorageError::Connection` on storage
    /// access failures. An empty slot is `Ok(None)`, not an error.
    async fn load(&self) -> Result<Option<ProgressDraft>, StorageError>;

    /// Replace the slot with the given draft.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the draft cannot be encoded or stored.
    async fn save(&self, draft: &ProgressDraft) -> Result<(), StorageError>;
}

/// In-memory slot implementation for tests and prototyping.
///
/// Holds the same JSON body the SQLite backend would hold, so encode and
/// decode failures behave identically across backends.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    slot: Arc<Mutex<Option<String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with a raw body, bypassing encoding. Lets tests
    /// inject malformed payloads.
    #[must_use]
    pub fn with_raw(body: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(body.into()))),
        }
    }

    /// Current raw slot body, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().map(|guard| guard.clone()).unwrap_or(None)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load(&self) -> Result<Option<ProgressDraft>, StorageError> {
        let guard = self
            .slot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let Some(body) = guard.as_ref() else {
            return Ok(None);
        };
        serde_json::from_str(body)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn save(&self, draft: &ProgressDraft) -> Result<(), StorageError> {
        let body =
            serde_json::to_string(draft).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self
            .slot
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(body);
        Ok(())
    }
}

/// Aggregates the progress repository behind a trait object for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::LessonId;

    #[tokio::test]
    async fn empty_slot_loads_as_none() {
        let repo = InMemoryRepository::new();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn slot_round_trips_a_draft() {
        let repo = InMemoryRepository::new();
        let draft = ProgressDraft {
            current_lesson: Some(LessonId::new(2)),
            streak: Some(3),
            ..ProgressDraft::default()
        };

        repo.save(&draft).await.unwrap();
        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(loaded, draft);
    }

    #[tokio::test]
    async fn malformed_body_is_a_serialization_error() {
        let repo = InMemoryRepository::with_raw("{not json");
        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn save_replaces_the_slot() {
        let repo = InMemoryRepository::new();
        repo.save(&ProgressDraft {
            xp: Some(100),
            ..ProgressDraft::default()
        })
        .await
        .unwrap();
        repo.save(&ProgressDraft {
            xp: Some(200),
            ..ProgressDraft::default()
        })
        .await
        .unwrap();

        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(loaded.xp, Some(200));
    }
}
