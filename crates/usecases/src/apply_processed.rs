use domain::order::ProcessedStatus;
use domain::event_key;
use persistence::UnitOfWorkFactory;
use tracing::instrument;

use crate::error::UseCaseError;
use crate::events::{ProcessedStatusWire, ORDER_PROCESSED};

/// Applies an `order.processed` event to the Order Service's own `Order`,
/// guarded by the inbox and by optimistic versioning. Both a missing order
/// and a stale version are silently dropped without recording the inbox key
/// — matching the reference behavior; see the design ledger for why this is
/// acceptable despite the theoretical replay-leak it allows.
#[instrument(skip(uow_factory))]
pub async fn apply_processed(
    uow_factory: &dyn UnitOfWorkFactory,
    order_id: String,
    status: ProcessedStatusWire,
    fail_reason: Option<String>,
    version: i32,
) -> Result<(), UseCaseError> {
    let key = event_key(ORDER_PROCESSED, &order_id, version);
    let uow = uow_factory.begin().await?;

    if uow.inbox().exists(&key).await? {
        uow.commit().await?;
        return Ok(());
    }

    let Some(mut order) = uow.orders().get(&order_id).await? else {
        uow.commit().await?;
        return Ok(());
    };

    if version <= order.version {
        uow.commit().await?;
        return Ok(());
    }

    let domain_status = match status {
        ProcessedStatusWire::Success => ProcessedStatus::Success,
        ProcessedStatusWire::Failed => ProcessedStatus::Failed,
    };
    order
        .apply_processed(domain_status, version, fail_reason)
        .expect("version already checked to advance the stored one");

    uow.orders().put(&order).await?;
    uow.inbox().add(&key).await?;
    uow.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ItemLine, Order};
    use persistence::{InMemoryUnitOfWorkFactory, OrdersRepository};

    async fn seed_order(factory: &InMemoryUnitOfWorkFactory, order_id: &str) {
        let order = Order::create(
            order_id,
            "cust-1",
            vec![ItemLine {
                sku: "widget".into(),
                quantity: 1,
                price: 1.0,
            }],
        )
        .unwrap();
        factory.store.put(&order).await.unwrap();
    }

    #[tokio::test]
    async fn success_marks_order_done() {
        let factory = InMemoryUnitOfWorkFactory::new();
        seed_order(&factory, "ord-proc-123").await;

        apply_processed(
            &factory,
            "ord-proc-123".into(),
            ProcessedStatusWire::Success,
            None,
            2,
        )
        .await
        .unwrap();

        let order = factory.store.get("ord-proc-123").await.unwrap().unwrap();
        assert_eq!(order.status, domain::OrderStatus::Done);
        assert_eq!(order.version, 2);
    }

    #[tokio::test]
    async fn redelivery_of_same_event_is_a_no_op() {
        let factory = InMemoryUnitOfWorkFactory::new();
        seed_order(&factory, "ord-1").await;

        for _ in 0..2 {
            apply_processed(&factory, "ord-1".into(), ProcessedStatusWire::Success, None, 2)
                .await
                .unwrap();
        }

        let order = factory.store.get("ord-1").await.unwrap().unwrap();
        assert_eq!(order.version, 2);
    }

    #[tokio::test]
    async fn missing_order_is_dropped_silently() {
        let factory = InMemoryUnitOfWorkFactory::new();
        apply_processed(&factory, "ord-missing".into(), ProcessedStatusWire::Success, None, 1)
            .await
            .unwrap();
        assert!(factory.store.get("ord-missing").await.unwrap().is_none());
    }
}
