use serde::{Deserialize, Serialize};

use crate::order::ItemLine;

/// SKUs that are always rejected, regardless of the random roll.
const EMBARGOED_SKUS: [&str; 2] = ["pineapple_pizza", "teapot"];
const FATTY_SKU: &str = "potato";
/// A random draw at or below this threshold is a success.
const SUCCESS_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Received,
    Done,
    Failed,
}

/// What [`ProcessingState::apply_order_created`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// The incoming version did not advance the stored one; no mutation took place.
    Ignored,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingResult {
    pub outcome: ProcessingOutcome,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub order_id: String,
    pub version: i32,
    pub status: ProcessingStatus,
    pub attempt_count: i32,
    pub last_error: Option<String>,
}

impl ProcessingState {
    /// A fresh state for an order the Processor Service has not seen yet.
    pub fn new(order_id: impl Into<String>) -> Self {
        ProcessingState {
            order_id: order_id.into(),
            version: 0,
            status: ProcessingStatus::Received,
            attempt_count: 0,
            last_error: None,
        }
    }

    /// Applies an `order.created` event. `random_source` is drawn at most
    /// once, and only when no embargo rule matches, so tests can inject a
    /// deterministic value without it being consumed on the embargo paths.
    pub fn apply_order_created(
        &mut self,
        items: &[ItemLine],
        _amount: f64,
        incoming_version: i32,
        random_source: impl FnOnce() -> f64,
    ) -> ProcessingResult {
        if incoming_version <= self.version {
            return ProcessingResult {
                outcome: ProcessingOutcome::Ignored,
                reason: Some("stale_version".to_string()),
            };
        }

        self.version = incoming_version;
        self.attempt_count += 1;

        let result = if items.iter().any(|i| EMBARGOED_SKUS.contains(&i.sku.as_str())) {
            failed(self, "Pineapple/teapot embargo")
        } else if items.iter().any(|i| i.sku == FATTY_SKU) {
            failed(self, "Too fatty food")
        } else if random_source() <= SUCCESS_THRESHOLD {
            self.status = ProcessingStatus::Done;
            self.last_error = None;
            ProcessingResult {
                outcome: ProcessingOutcome::Success,
                reason: None,
            }
        } else {
            failed(self, "Random failure")
        };

        result
    }
}

fn failed(state: &mut ProcessingState, reason: &str) -> ProcessingResult {
    state.status = ProcessingStatus::Failed;
    state.last_error = Some(reason.to_string());
    ProcessingResult {
        outcome: ProcessingOutcome::Failed,
        reason: Some(reason.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str) -> ItemLine {
        ItemLine {
            sku: sku.to_string(),
            quantity: 1,
            price: 1.0,
        }
    }

    #[test]
    fn stale_version_is_ignored_without_mutation() {
        let mut state = ProcessingState::new("ord-1");
        state.version = 3;
        let result = state.apply_order_created(&[item("widget")], 1.0, 3, || 0.1);
        assert_eq!(result.outcome, ProcessingOutcome::Ignored);
        assert_eq!(result.reason.as_deref(), Some("stale_version"));
        assert_eq!(state.version, 3);
        assert_eq!(state.attempt_count, 0);
    }

    #[test]
    fn teapot_is_embargoed() {
        let mut state = ProcessingState::new("ord-1");
        let result = state.apply_order_created(&[item("teapot")], 1.0, 1, || 0.0);
        assert_eq!(result.outcome, ProcessingOutcome::Failed);
        assert_eq!(result.reason.as_deref(), Some("Pineapple/teapot embargo"));
        assert_eq!(state.status, ProcessingStatus::Failed);
        assert_eq!(state.attempt_count, 1);
    }

    #[test]
    fn potato_is_too_fatty() {
        let mut state = ProcessingState::new("ord-1");
        let result = state.apply_order_created(&[item("potato")], 1.0, 1, || 0.0);
        assert_eq!(result.reason.as_deref(), Some("Too fatty food"));
    }

    #[test]
    fn random_roll_at_threshold_succeeds() {
        let mut state = ProcessingState::new("ord-1");
        let result = state.apply_order_created(&[item("widget")], 1.0, 1, || 0.6);
        assert_eq!(result.outcome, ProcessingOutcome::Success);
        assert_eq!(state.status, ProcessingStatus::Done);
    }

    #[test]
    fn random_roll_above_threshold_fails() {
        let mut state = ProcessingState::new("ord-1");
        let result = state.apply_order_created(&[item("widget")], 1.0, 1, || 0.61);
        assert_eq!(result.outcome, ProcessingOutcome::Failed);
        assert_eq!(result.reason.as_deref(), Some("Random failure"));
    }

    #[test]
    fn version_is_bumped_before_rules_run() {
        let mut state = ProcessingState::new("ord-1");
        state.apply_order_created(&[item("teapot")], 1.0, 5, || 0.0);
        assert_eq!(state.version, 5);
    }
}
