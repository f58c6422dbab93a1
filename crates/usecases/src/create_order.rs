use domain::{ItemLine, Order};
use persistence::UnitOfWorkFactory;
use tracing::instrument;

use crate::error::UseCaseError;
use crate::events::{OrderCreatedEvent, ORDER_CREATED};
use crate::metrics::Metrics;

/// Idempotent on `order_id`: a repeated call with the same id returns the
/// stored order unchanged, without emitting a second `order.created` event.
#[instrument(skip(uow_factory, metrics, items))]
pub async fn create_order(
    uow_factory: &dyn UnitOfWorkFactory,
    metrics: &Metrics,
    service_name: &str,
    order_id: String,
    customer_id: String,
    items: Vec<ItemLine>,
) -> Result<Order, UseCaseError> {
    let uow = uow_factory.begin().await?;

    if let Some(existing) = uow.orders().get(&order_id).await? {
        uow.commit().await?;
        return Ok(existing);
    }

    let order = Order::create(order_id, customer_id, items)?;
    uow.orders().put(&order).await?;

    let event = OrderCreatedEvent {
        order_id: order.order_id.clone(),
        customer_id: order.customer_id.clone(),
        items: order.items.clone(),
        amount: order.total_amount,
        version: order.version,
    };
    let payload = serde_json::to_value(&event)?;
    uow.outbox().put(ORDER_CREATED, payload).await?;
    uow.commit().await?;

    metrics
        .orders_created_total
        .with_label_values(&[service_name])
        .inc();

    Ok(order)
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
    async fn creates_order_and_enqueues_outbox_event() {
        let factory = InMemoryUnitOfWorkFactory::new();
        let metrics = Metrics::new(&Registry::new());

        let order = create_order(
            &factory,
            &metrics,
            "order-service",
            "ord-456".into(),
            "cust-789".into(),
            vec![item("laptop")],
        )
        .await
        .unwrap();

        assert_eq!(order.version, 1);
        let pending = factory.store.outbox_snapshot();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, "order.created");
    }

    #[tokio::test]
    async fn repeated_create_is_idempotent() {
        let factory = InMemoryUnitOfWorkFactory::new();
        let metrics = Metrics::new(&Registry::new());

        let first = create_order(
            &factory,
            &metrics,
            "order-service",
            "ord-1".into(),
            "cust-1".into(),
            vec![item("widget")],
        )
        .await
        .unwrap();

        let second = create_order(
            &factory,
            &metrics,
            "order-service",
            "ord-1".into(),
            "cust-1".into(),
            vec![item("widget")],
        )
        .await
        .unwrap();

        assert_eq!(first.version, second.version);
        assert_eq!(factory.store.outbox_snapshot().len(), 1);
    }
}
