use domain::{ItemLine, Order, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::error::HttpError;

#[derive(Debug, Clone, Deserialize)]
pub struct ItemLineRequest {
    pub sku: String,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<ItemLineRequest>,
}

impl CreateOrderRequest {
    /// Validates every field constraint enumerated for the HTTP edge and,
    /// if all pass, converts into the plain domain value the use case needs.
    pub fn into_parts(self) -> Result<(String, String, Vec<ItemLine>), HttpError> {
        let mut errors = Vec::new();

        if self.order_id.trim().is_empty() {
            errors.push("order_id must not be empty".to_string());
        }
        if self.customer_id.trim().is_empty() {
            errors.push("customer_id must not be empty".to_string());
        }
        if self.items.is_empty() {
            errors.push("items must not be empty".to_string());
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.sku.trim().is_empty() {
                errors.push(format!("items[{i}].sku must not be empty"));
            }
            if item.quantity <= 0 {
                errors.push(format!("items[{i}].quantity must be greater than 0"));
            }
            if item.price <= 0.0 {
                errors.push(format!("items[{i}].price must be greater than 0"));
            }
        }

        if !errors.is_empty() {
            return Err(HttpError::RequestValidation(errors));
        }

        let items = self
            .items
            .into_iter()
            .map(|i| ItemLine {
                sku: i.sku,
                quantity: i.quantity,
                price: i.price,
            })
            .collect();

        Ok((self.order_id, self.customer_id, items))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub customer_id: String,
    pub status: &'static str,
    pub total_amount: f64,
    pub version: i32,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            status: match order.status {
                OrderStatus::Pending => "pending",
                OrderStatus::Done => "done",
                OrderStatus::Failed => "failed",
            },
            total_amount: order.total_amount,
            version: order.version,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub service: String,
    pub status: &'static str,
}
