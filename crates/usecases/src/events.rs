//! Wire payloads exchanged over the broker. Field names are the canonical
//! JSON shapes both services agree on.

use domain::ItemLine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<ItemLine>,
    pub amount: f64,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProcessedEvent {
    pub order_id: String,
    pub status: ProcessedStatusWire,
    pub reason: Option<String>,
    pub version: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedStatusWire {
    Success,
    Failed,
}

pub const ORDER_CREATED: &str = "order.created";
pub const ORDER_PROCESSED: &str = "order.processed";
