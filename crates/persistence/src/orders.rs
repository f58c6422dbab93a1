use async_trait::async_trait;
use deadpool_postgres::Object;
use domain::{ItemLine, Order, OrderStatus};

use crate::error::RepositoryError;

#[async_trait]
pub trait OrdersRepository: Send + Sync {
    async fn get(&self, order_id: &str) -> Result<Option<Order>, RepositoryError>;
    /// Insert-or-update keyed by `order_id`, overwriting every mutable field.
    async fn put(&self, order: &Order) -> Result<(), RepositoryError>;
}

pub struct PgOrdersRepository<'a>(pub &'a Object);

#[async_trait]
impl<'a> OrdersRepository for PgOrdersRepository<'a> {
    async fn get(&self, order_id: &str) -> Result<Option<Order>, RepositoryError> {
        let row = self
            .0
            .query_opt(
                "SELECT order_id, customer_id, items, amount, status, version, fail_reason \
                 FROM orders WHERE order_id = $1",
                &[&order_id],
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items_json: serde_json::Value = row.get("items");
        let items: Vec<ItemLine> = serde_json::from_value(items_json)?;
        let status: String = row.get("status");

        Ok(Some(Order {
            order_id: row.get("order_id"),
            customer_id: row.get("customer_id"),
            items,
            total_amount: row.get("amount"),
            status: parse_status(&status),
            version: row.get("version"),
            fail_reason: row.get("fail_reason"),
        }))
    }

    async fn put(&self, order: &Order) -> Result<(), RepositoryError> {
        let items_json = serde_json::to_value(&order.items)?;
        let status = status_str(order.status);

        self.0
            .execute(
                "INSERT INTO orders (order_id, customer_id, items, amount, status, version, fail_reason) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (order_id) DO UPDATE SET \
                   customer_id = EXCLUDED.customer_id, \
                   items = EXCLUDED.items, \
                   amount = EXCLUDED.amount, \
                   status = EXCLUDED.status, \
                   version = EXCLUDED.version, \
                   fail_reason = EXCLUDED.fail_reason",
                &[
                    &order.order_id,
                    &order.customer_id,
                    &items_json,
                    &order.total_amount,
                    &status,
                    &order.version,
                    &order.fail_reason,
                ],
            )
            .await?;
        Ok(())
    }
}

fn status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::Done => "done",
        OrderStatus::Failed => "failed",
    }
}

fn parse_status(s: &str) -> OrderStatus {
    match s {
        "done" => OrderStatus::Done,
        "failed" => OrderStatus::Failed,
        _ => OrderStatus::Pending,
    }
}
