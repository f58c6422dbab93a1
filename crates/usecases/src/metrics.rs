use prometheus::{CounterVec, Opts, Registry};

/// Counters mirroring the original system's instrumentation points. Ambient
/// observability, not a pipeline feature — registered once at process start
/// and exposed on `GET /metrics`.
pub struct Metrics {
    pub orders_created_total: CounterVec,
    pub orders_processed_total: CounterVec,
    pub outbox_published_total: CounterVec,
    pub outbox_retries_total: CounterVec,
    pub outbox_dlq_total: CounterVec,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Self {
        let orders_created_total = CounterVec::new(
            Opts::new("orders_created_total", "Orders created via the HTTP edge"),
            &["service"],
        )
        .unwrap();
        let orders_processed_total = CounterVec::new(
            Opts::new(
                "orders_processed_total",
                "order.created events processed into a terminal outcome",
            ),
            &["service", "status"],
        )
        .unwrap();
        let outbox_published_total = CounterVec::new(
            Opts::new("outbox_published_total", "Outbox rows successfully published"),
            &["service", "event_type"],
        )
        .unwrap();
        let outbox_retries_total = CounterVec::new(
            Opts::new("outbox_retries_total", "Outbox publish attempts that failed and were retried"),
            &["service"],
        )
        .unwrap();
        let outbox_dlq_total = CounterVec::new(
            Opts::new("outbox_dlq_total", "Outbox rows retired to the dead letter queue"),
            &["service"],
        )
        .unwrap();

        registry.register(Box::new(orders_created_total.clone())).ok();
        registry.register(Box::new(orders_processed_total.clone())).ok();
        registry.register(Box::new(outbox_published_total.clone())).ok();
        registry.register(Box::new(outbox_retries_total.clone())).ok();
        registry.register(Box::new(outbox_dlq_total.clone())).ok();

        Self {
            orders_created_total,
            orders_processed_total,
            outbox_published_total,
            outbox_retries_total,
            outbox_dlq_total,
        }
    }
}
