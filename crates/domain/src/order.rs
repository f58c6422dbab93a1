use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single line item on an order. `quantity` and `price` must both be
/// strictly positive; this is enforced at [`Order::create`], not here, since
/// a bare `ItemLine` can be constructed freely by deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLine {
    pub sku: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Done,
    Failed,
}

/// The outcome reported by the Processor Service, mapped onto [`OrderStatus`]
/// by [`Order::apply_processed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedStatus {
    Success,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("items must not be empty")]
    EmptyItems,
    #[error("quantity must be greater than 0")]
    NonPositiveQuantity,
    #[error("price must be greater than 0")]
    NonPositivePrice,
    #[error("order_id must not be empty")]
    EmptyOrderId,
    #[error("customer_id must not be empty")]
    EmptyCustomerId,
    #[error("sku must not be empty")]
    EmptySku,
}

/// Raised when [`Order::apply_processed`] is called with a version that does
/// not advance the order's recorded version.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("version {new_version} does not advance current version {current_version}")]
pub struct StaleVersion {
    pub current_version: i32,
    pub new_version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<ItemLine>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub version: i32,
    pub fail_reason: Option<String>,
}

impl Order {
    /// Constructs a new `pending`, version-1 order. `total_amount` is derived
    /// once here and never stored independently of `items`.
    pub fn create(
        order_id: impl Into<String>,
        customer_id: impl Into<String>,
        items: Vec<ItemLine>,
    ) -> Result<Self, ValidationError> {
        let order_id = order_id.into();
        let customer_id = customer_id.into();

        if order_id.trim().is_empty() {
            return Err(ValidationError::EmptyOrderId);
        }
        if customer_id.trim().is_empty() {
            return Err(ValidationError::EmptyCustomerId);
        }
        if items.is_empty() {
            return Err(ValidationError::EmptyItems);
        }
        for item in &items {
            if item.sku.trim().is_empty() {
                return Err(ValidationError::EmptySku);
            }
            if item.quantity <= 0 {
                return Err(ValidationError::NonPositiveQuantity);
            }
            if item.price <= 0.0 {
                return Err(ValidationError::NonPositivePrice);
            }
        }

        let total_amount = total_amount(&items);

        Ok(Order {
            order_id,
            customer_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            version: 1,
            fail_reason: None,
        })
    }

    /// Applies a processing outcome. Only legal when `new_version` strictly
    /// advances the stored version; callers that have already checked this
    /// (the `ApplyProcessed` use case) will never hit the error path, but the
    /// invariant is enforced here too so the type can't be misused.
    pub fn apply_processed(
        &mut self,
        new_status: ProcessedStatus,
        new_version: i32,
        fail_reason: Option<String>,
    ) -> Result<(), StaleVersion> {
        if new_version <= self.version {
            return Err(StaleVersion {
                current_version: self.version,
                new_version,
            });
        }

        self.status = match new_status {
            ProcessedStatus::Success => OrderStatus::Done,
            ProcessedStatus::Failed => OrderStatus::Failed,
        };
        self.fail_reason = match new_status {
            ProcessedStatus::Success => None,
            ProcessedStatus::Failed => fail_reason,
        };
        self.version = new_version;
        Ok(())
    }
}

fn total_amount(items: &[ItemLine]) -> f64 {
    items.iter().map(|i| i.price * i.quantity as f64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, quantity: i64, price: f64) -> ItemLine {
        ItemLine {
            sku: sku.to_string(),
            quantity,
            price,
        }
    }

    #[test]
    fn create_computes_total_amount() {
        let order = Order::create(
            "ord-456",
            "cust-789",
            vec![item("laptop", 1, 1200.0), item("mouse", 2, 25.0)],
        )
        .unwrap();

        assert_eq!(order.total_amount, 1250.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.version, 1);
    }

    #[test]
    fn create_rejects_empty_items() {
        assert_eq!(
            Order::create("ord-1", "cust-1", vec![]).unwrap_err(),
            ValidationError::EmptyItems
        );
    }

    #[test]
    fn create_rejects_non_positive_quantity() {
        assert_eq!(
            Order::create("ord-1", "cust-1", vec![item("sku", 0, 1.0)]).unwrap_err(),
            ValidationError::NonPositiveQuantity
        );
    }

    #[test]
    fn create_rejects_non_positive_price() {
        assert_eq!(
            Order::create("ord-1", "cust-1", vec![item("sku", 1, 0.0)]).unwrap_err(),
            ValidationError::NonPositivePrice
        );
    }

    #[test]
    fn apply_processed_success_marks_done() {
        let mut order = Order::create("ord-1", "cust-1", vec![item("sku", 1, 1.0)]).unwrap();
        order
            .apply_processed(ProcessedStatus::Success, 2, None)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Done);
        assert_eq!(order.version, 2);
        assert_eq!(order.fail_reason, None);
    }

    #[test]
    fn apply_processed_failed_sets_reason() {
        let mut order = Order::create("ord-1", "cust-1", vec![item("sku", 1, 1.0)]).unwrap();
        order
            .apply_processed(ProcessedStatus::Failed, 2, Some("boom".into()))
            .unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.fail_reason, Some("boom".to_string()));
    }

    #[test]
    fn apply_processed_rejects_stale_version() {
        let mut order = Order::create("ord-1", "cust-1", vec![item("sku", 1, 1.0)]).unwrap();
        let err = order
            .apply_processed(ProcessedStatus::Success, 1, None)
            .unwrap_err();
        assert_eq!(err.current_version, 1);
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
