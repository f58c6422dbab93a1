//! Domain model for the order pipeline: pure state-transition rules with no
//! dependency on persistence, messaging, or HTTP.

pub mod events;
pub mod order;
pub mod processing;

pub use events::event_key;
pub use order::{ItemLine, Order, OrderStatus, ValidationError};
pub use processing::{ProcessingOutcome, ProcessingResult, ProcessingState, ProcessingStatus};
