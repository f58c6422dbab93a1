//! The outbox publisher worker (§4.4): claims pending rows, publishes them
//! to the broker with per-row exponential backoff, and retires exhausted
//! rows to the dead-letter queue. One poisoned row never blocks the rest.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lapin::Connection;
use persistence::{OutboxEntry, UnitOfWorkFactory};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::metrics::Metrics;

pub const MAX_RETRIES: i32 = 5;
pub const INITIAL_BACKOFF_SECONDS: u64 = 5;
pub const MAX_BACKOFF_SECONDS: u64 = 300;
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// `min(INITIAL * 2^(retry_count - 1), MAX)`; zero when `retry_count == 0`
/// (the row has never been retried, so there is no backoff window yet).
pub fn backoff_delay(retry_count: i32) -> Duration {
    if retry_count <= 0 {
        return Duration::ZERO;
    }
    let shift = (retry_count - 1).min(63) as u32;
    let secs = INITIAL_BACKOFF_SECONDS.saturating_mul(1u64 << shift);
    Duration::from_secs(secs.min(MAX_BACKOFF_SECONDS))
}

/// `true` iff another attempt is still allowed.
pub fn should_retry(retry_count: i32) -> bool {
    retry_count < MAX_RETRIES
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

fn due_for_retry(entry: &OutboxEntry) -> bool {
    let Some(last_retry_at) = &entry.last_retry_at else {
        return true;
    };
    let Ok(last) = chrono::DateTime::parse_from_rfc3339(last_retry_at) else {
        return true;
    };
    let elapsed = Utc::now().signed_duration_since(last.with_timezone(&Utc));
    let backoff = chrono::Duration::from_std(backoff_delay(entry.retry_count)).unwrap_or_default();
    elapsed >= backoff
}

/// Runs the publisher loop until `shutdown` is cancelled.
pub async fn run(
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    connection: Arc<Connection>,
    metrics: Arc<Metrics>,
    service_name: String,
    shutdown: CancellationToken,
) {
    loop {
        if let Err(e) = publish_pending(&*uow_factory, &connection, &metrics, &service_name).await
        {
            error!(error = %e, "outbox publisher tick failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shutdown.cancelled() => {
                info!("outbox publisher shutting down");
                break;
            }
        }
    }
}

#[instrument(skip(uow_factory, connection, metrics))]
async fn publish_pending(
    uow_factory: &dyn UnitOfWorkFactory,
    connection: &Connection,
    metrics: &Metrics,
    service_name: &str,
) -> anyhow::Result<()> {
    let snapshot_uow = uow_factory.begin().await?;
    let pending = snapshot_uow.outbox().claim_pending().await?;
    snapshot_uow.commit().await?;

    for entry in pending {
        if !should_retry(entry.retry_count) {
            let uow = uow_factory.begin().await?;
            uow.outbox()
                .move_to_dlq(&entry, "Max retries (5) exceeded", &now_iso8601())
                .await?;
            uow.commit().await?;
            metrics
                .outbox_dlq_total
                .with_label_values(&[service_name])
                .inc();
            continue;
        }

        if !due_for_retry(&entry) {
            continue;
        }

        match broker::publish(connection, &entry.event_type, &entry.payload).await {
            Ok(()) => {
                let uow = uow_factory.begin().await?;
                uow.outbox().mark_published(entry.id, &now_iso8601()).await?;
                uow.commit().await?;
                metrics
                    .outbox_published_total
                    .with_label_values(&[service_name, &entry.event_type])
                    .inc();
            }
            Err(e) => {
                warn!(error = %e, outbox_id = entry.id, "publish failed, will retry with backoff");
                let uow = uow_factory.begin().await?;
                uow.outbox().record_failure(entry.id, &now_iso8601()).await?;
                uow.commit().await?;
                metrics
                    .outbox_retries_total
                    .with_label_values(&[service_name])
                    .inc();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_matches_the_reference_schedule() {
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(2), Duration::from_secs(10));
        assert_eq!(backoff_delay(3), Duration::from_secs(20));
        assert_eq!(backoff_delay(4), Duration::from_secs(40));
        assert_eq!(backoff_delay(10), Duration::from_secs(300));
    }

    #[test]
    fn retry_count_zero_has_no_backoff_window() {
        assert_eq!(backoff_delay(0), Duration::ZERO);
    }

    #[test]
    fn should_retry_is_true_below_max() {
        assert!(should_retry(0));
        assert!(should_retry(4));
        assert!(!should_retry(5));
        assert!(!should_retry(6));
    }
}
