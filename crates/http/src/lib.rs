//! The HTTP edge (Order Service only): a thin translator from request to
//! use-case command to response. `GET /health`, `POST /orders`,
//! `GET /orders/{id}`, `GET /metrics`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod metrics;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use persistence::UnitOfWorkFactory;
use tokio::net::TcpListener;
use tracing::info;
use usecases::Metrics as UseCaseMetrics;

pub use error::HttpError;
pub use handlers::AppState;
pub use metrics::HttpMetrics;

pub struct Server {
    state: AppState,
    port: u16,
}

impl Server {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        usecase_metrics: Arc<UseCaseMetrics>,
        registry: Arc<prometheus::Registry>,
        service_name: String,
        port: u16,
    ) -> Self {
        let http_metrics = Arc::new(HttpMetrics::new(&registry));
        Self {
            state: AppState {
                uow_factory,
                usecase_metrics,
                http_metrics,
                registry,
                service_name,
            },
            port,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::handle_health))
            .route("/orders", post(handlers::handle_create_order))
            .route("/orders/{id}", get(handlers::handle_get_order))
            .route("/metrics", get(handlers::handle_metrics))
            .layer(axum::middleware::from_fn_with_state(
                self.state.clone(),
                handlers::metrics_middleware,
            ))
            .with_state(self.state.clone())
    }

    pub async fn start(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;
        info!(%addr, "http edge listening");

        let router = self.router();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::InMemoryUnitOfWorkFactory;
    use prometheus::Registry;

    #[test]
    fn server_builds_a_router() {
        let factory: Arc<dyn UnitOfWorkFactory> = Arc::new(InMemoryUnitOfWorkFactory::new());
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(UseCaseMetrics::new(&registry));
        let server = Server::new(factory, metrics, registry, "order-service".into(), 0);
        let _router = server.router();
    }
}
