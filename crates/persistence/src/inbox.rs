use async_trait::async_trait;
use deadpool_postgres::Object;

use crate::error::RepositoryError;

#[async_trait]
pub trait InboxRepository: Send + Sync {
    async fn exists(&self, event_key: &str) -> Result<bool, RepositoryError>;
    /// No-op if `event_key` is already present, guaranteeing in-transaction
    /// idempotence when the same event is replayed.
    async fn add(&self, event_key: &str) -> Result<(), RepositoryError>;
}

pub struct PgInboxRepository<'a>(pub &'a Object);

#[async_trait]
impl<'a> InboxRepository for PgInboxRepository<'a> {
    async fn exists(&self, event_key: &str) -> Result<bool, RepositoryError> {
        let row = self
            .0
            .query_opt(
                "SELECT 1 FROM processed_inbox WHERE event_key = $1",
                &[&event_key],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn add(&self, event_key: &str) -> Result<(), RepositoryError> {
        self.0
            .execute(
                "INSERT INTO processed_inbox (event_key) VALUES ($1) ON CONFLICT DO NOTHING",
                &[&event_key],
            )
            .await?;
        Ok(())
    }
}
