use async_trait::async_trait;
use deadpool_postgres::Object;
use serde_json::Value;

use crate::error::RepositoryError;

#[derive(Debug, Clone, PartialEq)]
pub struct DlqEntry {
    pub id: i32,
    pub original_event_type: String,
    pub payload: Value,
    pub retry_count: i32,
    pub last_retry_at: Option<String>,
    pub failure_reason: String,
    pub moved_to_dlq_at: String,
}

/// Read access to the append-only DLQ audit sink. Writes happen atomically
/// alongside the outbox delete via [`crate::outbox::OutboxRepository::move_to_dlq`].
#[async_trait]
pub trait DlqRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<DlqEntry>, RepositoryError>;
}

pub struct PgDlqRepository<'a>(pub &'a Object);

#[async_trait]
impl<'a> DlqRepository for PgDlqRepository<'a> {
    async fn list(&self) -> Result<Vec<DlqEntry>, RepositoryError> {
        let rows = self
            .0
            .query(
                "SELECT id, original_event_type, payload, retry_count, last_retry_at, \
                        failure_reason, moved_to_dlq_at \
                 FROM dead_letter_queue ORDER BY id ASC",
                &[],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| DlqEntry {
                id: row.get("id"),
                original_event_type: row.get("original_event_type"),
                payload: row.get("payload"),
                retry_count: row.get("retry_count"),
                last_retry_at: row.get("last_retry_at"),
                failure_reason: row.get("failure_reason"),
                moved_to_dlq_at: row.get("moved_to_dlq_at"),
            })
            .collect())
    }
}
