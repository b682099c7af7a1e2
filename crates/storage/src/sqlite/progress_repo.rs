use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tracing::debug;

use crate::repository::{ProgressRepository, StorageError};
use course_core::model::ProgressDraft;

use super::SqliteRepository;

/// Fixed key the single progress record lives under.
pub const PROGRESS_SLOT_KEY: &str = "learner_progress";

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load(&self) -> Result<Option<ProgressDraft>, StorageError> {
        let row = sqlx::query("SELECT body FROM progress_slots WHERE slot_key = ?1")
            .bind(PROGRESS_SLOT_KEY)
            .fetch_optional(self.pool())
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let body: String = row
            .try_get("body")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }

    async fn save(&self, draft: &ProgressDraft) -> Result<(), StorageError> {
        let body = serde_json::to_string(draft)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO progress_slots (slot_key, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slot_key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
        )
        .bind(PROGRESS_SLOT_KEY)
        .bind(&body)
        .bind(Utc::now())
        .execute(self.pool())
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        debug!(slot = PROGRESS_SLOT_KEY, bytes = body.len(), "progress slot written");
        Ok(())
    }
}
