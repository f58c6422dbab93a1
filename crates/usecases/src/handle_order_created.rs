use domain::{event_key, ItemLine, ProcessingOutcome, ProcessingState};
use persistence::UnitOfWorkFactory;
use tracing::instrument;

use crate::error::UseCaseError;
use crate::events::{OrderProcessedEvent, ProcessedStatusWire, ORDER_CREATED, ORDER_PROCESSED};
use crate::metrics::Metrics;

/// Applies an `order.created` event against the Processor Service's
/// `ProcessingState`, guarded by the inbox so replays are no-ops.
/// `random_source` drives the business-rule dice roll and is only ever
/// drawn when no embargo rule matches.
#[instrument(skip(uow_factory, metrics, items, random_source))]
pub async fn handle_order_created(
    uow_factory: &dyn UnitOfWorkFactory,
    metrics: &Metrics,
    service_name: &str,
    order_id: String,
    items: Vec<ItemLine>,
    amount: f64,
    version: i32,
    random_source: impl FnOnce() -> f64,
) -> Result<(), UseCaseError> {
    let key = event_key(ORDER_CREATED, &order_id, version);
    let uow = uow_factory.begin().await?;

    if uow.inbox().exists(&key).await? {
        uow.commit().await?;
        return Ok(());
    }

    let mut state = uow
        .states()
        .get(&order_id)
        .await?
        .unwrap_or_else(|| ProcessingState::new(&order_id));

    let result = state.apply_order_created(&items, amount, version, random_source);

    if result.outcome == ProcessingOutcome::Ignored {
        uow.inbox().add(&key).await?;
        uow.commit().await?;
        return Ok(());
    }

    uow.states().upsert(&state).await?;
    uow.inbox().add(&key).await?;

    let wire_status = match result.outcome {
        ProcessingOutcome::Success => ProcessedStatusWire::Success,
        ProcessingOutcome::Failed => ProcessedStatusWire::Failed,
        ProcessingOutcome::Ignored => unreachable!("handled above"),
    };
    let event = OrderProcessedEvent {
        order_id: order_id.clone(),
        status: wire_status,
        reason: result.reason.clone(),
        version,
    };
    let payload = serde_json::to_value(&event)?;
    uow.outbox().put(ORDER_PROCESSED, payload).await?;
    uow.commit().await?;

    let status_label = match result.outcome {
        ProcessingOutcome::Success => "success",
        _ => "failed",
    };
    metrics
        .orders_processed_total
        .with_label_values(&[service_name, status_label])
        .inc();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::InMemoryUnitOfWorkFactory;
    use prometheus::Registry;

    fn item(sku: &str) -> ItemLine {
        ItemLine {
            sku: sku.to_string(),
            quantity: 1,
            price: 10.0,
        }
    }

    #[tokio::test]
    async fn embargoed_item_fails_without_drawing_random() {
        let factory = InMemoryUnitOfWorkFactory::new();
        let metrics = Metrics::new(&Registry::new());

        handle_order_created(
            &factory,
            &metrics,
            "processor-service",
            "ord-1".into(),
            vec![item("teapot")],
            10.0,
            1,
            || panic!("random source must not be drawn on the embargo path"),
        )
        .await
        .unwrap();

        let pending = factory.store.outbox_snapshot();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, "order.processed");
    }

    #[tokio::test]
    async fn stale_version_is_absorbed_by_inbox_without_new_event() {
        let factory = InMemoryUnitOfWorkFactory::new();
        let metrics = Metrics::new(&Registry::new());

        handle_order_created(
            &factory,
            &metrics,
            "processor-service",
            "ord-1".into(),
            vec![item("widget")],
            10.0,
            1,
            || 0.1,
        )
        .await
        .unwrap();
        assert_eq!(factory.store.outbox_snapshot().len(), 1);

        handle_order_created(
            &factory,
            &metrics,
            "processor-service",
            "ord-1".into(),
            vec![item("widget")],
            10.0,
            1,
            || panic!("stale version must not redraw"),
        )
        .await
        .unwrap();

        assert_eq!(factory.store.outbox_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_absorbed_by_inbox() {
        let factory = InMemoryUnitOfWorkFactory::new();
        let metrics = Metrics::new(&Registry::new());

        for _ in 0..2 {
            handle_order_created(
                &factory,
                &metrics,
                "processor-service",
                "ord-1".into(),
                vec![item("widget")],
                10.0,
                1,
                || 0.1,
            )
            .await
            .unwrap();
        }

        assert_eq!(factory.store.outbox_snapshot().len(), 1);
    }
}
