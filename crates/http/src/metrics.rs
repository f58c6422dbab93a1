use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

/// HTTP-edge-specific observability: request counts, latency, and error
/// counts. Business-level counters (`orders_created_total`, ...) live in
/// `usecases::Metrics` and are registered into the same [`Registry`].
pub struct HttpMetrics {
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub errors_total: CounterVec,
}

impl HttpMetrics {
    pub fn new(registry: &Registry) -> Self {
        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["method", "path", "status"],
        )
        .unwrap();
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["method", "path"],
        )
        .unwrap();
        let errors_total = CounterVec::new(
            Opts::new("errors_total", "HTTP responses with a 4xx/5xx status"),
            &["method", "path", "status"],
        )
        .unwrap();

        registry
            .register(Box::new(http_requests_total.clone()))
            .ok();
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .ok();
        registry.register(Box::new(errors_total.clone())).ok();

        Self {
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
        }
    }
}
