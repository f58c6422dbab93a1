//! Event key formatting shared by the inbox and every use case that checks it.

/// Builds the deterministic dedup key `"<event_type>:<order_id>:<version>"`.
pub fn event_key(event_type: &str, order_id: &str, version: i32) -> String {
    format!("{event_type}:{order_id}:{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_event_key() {
        assert_eq!(event_key("order.created", "ord-1", 3), "order.created:ord-1:3");
    }
}
