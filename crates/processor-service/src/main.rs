//! Processor Service composition root: the `order.created` consumer, the
//! outbox publisher, and a minimal health/metrics listener, sharing one DB
//! pool and one broker connection, coordinated by a single cancellation
//! token for graceful shutdown.

use std::sync::Arc;

use app_config::AppConfig;
use axum::routing::get;
use axum::{Json, Router};
use persistence::{PgUnitOfWorkFactory, UnitOfWorkFactory};
use prometheus::Registry;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use usecases::events::{OrderCreatedEvent, ORDER_CREATED};
use usecases::Metrics;

#[derive(Clone)]
struct HealthState {
    service_name: String,
    registry: Arc<Registry>,
}

#[derive(Serialize)]
struct HealthResponse {
    service: String,
    status: &'static str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::load()?;
    info!(service = %cfg.service_name, "starting processor service");

    let pool = db::init_db_pool(&cfg, "migrations/processor-service").await?;
    let uow_factory: Arc<dyn UnitOfWorkFactory> = Arc::new(PgUnitOfWorkFactory::new(pool));

    let registry = Arc::new(Registry::new());
    let metrics = Arc::new(Metrics::new(&registry));

    let connection = Arc::new(broker::connect(&cfg.rabbitmq_url).await?);

    let shutdown = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    tasks.spawn({
        let uow_factory = uow_factory.clone();
        let connection = connection.clone();
        let metrics = metrics.clone();
        let service_name = cfg.service_name.clone();
        let shutdown = shutdown.clone();
        async move {
            usecases::outbox_publisher::run(uow_factory, connection, metrics, service_name, shutdown)
                .await;
            Ok::<(), anyhow::Error>(())
        }
    });

    tasks.spawn({
        let uow_factory = uow_factory.clone();
        let connection = connection.clone();
        let metrics = metrics.clone();
        let service_name = cfg.service_name.clone();
        let shutdown = shutdown.clone();
        async move {
            let (_channel, consumer) =
                broker::consume(&connection, &service_name, ORDER_CREATED).await?;
            usecases::consumer_loop::run(consumer, shutdown, |payload| {
                let uow_factory = uow_factory.clone();
                let metrics = metrics.clone();
                let service_name = service_name.clone();
                async move {
                    let event: OrderCreatedEvent = serde_json::from_value(payload)?;
                    usecases::handle_order_created(
                        &*uow_factory,
                        &metrics,
                        &service_name,
                        event.order_id,
                        event.items,
                        event.amount,
                        event.version,
                        rand::random::<f64>,
                    )
                    .await?;
                    Ok(())
                }
            })
            .await;
            Ok::<(), anyhow::Error>(())
        }
    });

    tasks.spawn({
        let registry = registry.clone();
        let service_name = cfg.service_name.clone();
        let port = cfg.health_port;
        let shutdown = shutdown.clone();
        async move { run_health_server(service_name, registry, port, shutdown).await }
    });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
        Some(result) = tasks.join_next() => {
            error!(?result, "a worker task exited unexpectedly");
        }
    }

    shutdown.cancel();

    let drain = async {
        while tasks.join_next().await.is_some() {}
    };
    if tokio::time::timeout(cfg.shutdown_timeout, drain).await.is_err() {
        error!("graceful shutdown timed out, some tasks may not have finished");
    }

    info!("processor service stopped");
    Ok(())
}

async fn run_health_server(
    service_name: String,
    registry: Arc<Registry>,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let state = HealthState { service_name, registry };
    let router = Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "health listener started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn handle_health(axum::extract::State(state): axum::extract::State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        service: state.service_name.clone(),
        status: "ok",
    })
}

async fn handle_metrics(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> impl axum::response::IntoResponse {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).ok();
    (
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
