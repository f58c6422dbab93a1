use async_trait::async_trait;
use deadpool_postgres::Object;
use serde_json::Value;

use crate::error::RepositoryError;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i32,
    pub event_type: String,
    pub payload: Value,
    pub published_at: Option<String>,
    pub retry_count: i32,
    pub last_retry_at: Option<String>,
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Appends a row with `published_at = null, retry_count = 0`. Callers
    /// serialize their event payload to JSON before calling, keeping this
    /// trait object-safe.
    async fn put(&self, event_type: &str, payload: Value) -> Result<(), RepositoryError>;
    /// Every row with `published_at IS NULL`, ordered by `id` ascending.
    async fn claim_pending(&self) -> Result<Vec<OutboxEntry>, RepositoryError>;
    async fn mark_published(&self, id: i32, published_at: &str) -> Result<(), RepositoryError>;
    async fn record_failure(&self, id: i32, last_retry_at: &str) -> Result<(), RepositoryError>;
    /// Deletes the outbox row and inserts the corresponding DLQ row, atomically.
    async fn move_to_dlq(
        &self,
        entry: &OutboxEntry,
        failure_reason: &str,
        moved_to_dlq_at: &str,
    ) -> Result<(), RepositoryError>;
}

pub struct PgOutboxRepository<'a>(pub &'a Object);

#[async_trait]
impl<'a> OutboxRepository for PgOutboxRepository<'a> {
    async fn put(&self, event_type: &str, payload: Value) -> Result<(), RepositoryError> {
        self.0
            .execute(
                "INSERT INTO outbox (event_type, payload, published_at, retry_count, last_retry_at) \
                 VALUES ($1, $2, NULL, 0, NULL)",
                &[&event_type, &payload],
            )
            .await?;
        Ok(())
    }

    async fn claim_pending(&self) -> Result<Vec<OutboxEntry>, RepositoryError> {
        let rows = self
            .0
            .query(
                "SELECT id, event_type, payload, published_at, retry_count, last_retry_at \
                 FROM outbox WHERE published_at IS NULL ORDER BY id ASC",
                &[],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| OutboxEntry {
                id: row.get("id"),
                event_type: row.get("event_type"),
                payload: row.get("payload"),
                published_at: row.get("published_at"),
                retry_count: row.get("retry_count"),
                last_retry_at: row.get("last_retry_at"),
            })
            .collect())
    }

    async fn mark_published(&self, id: i32, published_at: &str) -> Result<(), RepositoryError> {
        self.0
            .execute(
                "UPDATE outbox SET published_at = $2 WHERE id = $1",
                &[&id, &published_at],
            )
            .await?;
        Ok(())
    }

    async fn record_failure(&self, id: i32, last_retry_at: &str) -> Result<(), RepositoryError> {
        self.0
            .execute(
                "UPDATE outbox SET retry_count = retry_count + 1, last_retry_at = $2 WHERE id = $1",
                &[&id, &last_retry_at],
            )
            .await?;
        Ok(())
    }

    async fn move_to_dlq(
        &self,
        entry: &OutboxEntry,
        failure_reason: &str,
        moved_to_dlq_at: &str,
    ) -> Result<(), RepositoryError> {
        self.0
            .execute(
                "INSERT INTO dead_letter_queue \
                 (original_event_type, payload, retry_count, last_retry_at, failure_reason, moved_to_dlq_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &entry.event_type,
                    &entry.payload,
                    &entry.retry_count,
                    &entry.last_retry_at,
                    &failure_reason,
                    &moved_to_dlq_at,
                ],
            )
            .await?;
        self.0
            .execute("DELETE FROM outbox WHERE id = $1", &[&entry.id])
            .await?;
        Ok(())
    }
}
