use async_trait::async_trait;
use deadpool_postgres::Object;
use domain::{ProcessingState, ProcessingStatus};

use crate::error::RepositoryError;

#[async_trait]
pub trait ProcessingStatesRepository: Send + Sync {
    async fn get(&self, order_id: &str) -> Result<Option<ProcessingState>, RepositoryError>;
    async fn upsert(&self, state: &ProcessingState) -> Result<(), RepositoryError>;
}

pub struct PgProcessingStatesRepository<'a>(pub &'a Object);

#[async_trait]
impl<'a> ProcessingStatesRepository for PgProcessingStatesRepository<'a> {
    async fn get(&self, order_id: &str) -> Result<Option<ProcessingState>, RepositoryError> {
        let row = self
            .0
            .query_opt(
                "SELECT order_id, version, status, attempt_count, last_error \
                 FROM processing_states WHERE order_id = $1",
                &[&order_id],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row.get("status");

        Ok(Some(ProcessingState {
            order_id: row.get("order_id"),
            version: row.get("version"),
            status: parse_status(&status),
            attempt_count: row.get("attempt_count"),
            last_error: row.get("last_error"),
        }))
    }

    async fn upsert(&self, state: &ProcessingState) -> Result<(), RepositoryError> {
        self.0
            .execute(
                "INSERT INTO processing_states (order_id, version, status, attempt_count, last_error) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (order_id) DO UPDATE SET \
                   version = EXCLUDED.version, \
                   status = EXCLUDED.status, \
                   attempt_count = EXCLUDED.attempt_count, \
                   last_error = EXCLUDED.last_error",
                &[
                    &state.order_id,
                    &state.version,
                    &status_str(state.status),
                    &state.attempt_count,
                    &state.last_error,
                ],
            )
            .await?;
        Ok(())
    }
}

fn status_str(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Received => "received",
        ProcessingStatus::Done => "done",
        ProcessingStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> ProcessingStatus {
    match s {
        "done" => ProcessingStatus::Done,
        "failed" => ProcessingStatus::Failed,
        _ => ProcessingStatus::Received,
    }
}
