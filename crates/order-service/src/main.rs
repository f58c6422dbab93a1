//! Order Service composition root: HTTP edge, outbox publisher, and the
//! `order.processed` consumer, sharing one DB pool and one broker connection,
//! coordinated by a single cancellation token for graceful shutdown.

use std::sync::Arc;

use app_config::AppConfig;
use persistence::{PgUnitOfWorkFactory, UnitOfWorkFactory};
use prometheus::Registry;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use usecases::events::{OrderProcessedEvent, ORDER_PROCESSED};
use usecases::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::load()?;
    info!(service = %cfg.service_name, "starting order service");

    let pool = db::init_db_pool(&cfg, "migrations/order-service").await?;
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
        let service_name = cfg.service_name.clone();
        let shutdown = shutdown.clone();
        async move {
            let (_channel, consumer) =
                broker::consume(&connection, &service_name, ORDER_PROCESSED).await?;
            usecases::consumer_loop::run(consumer, shutdown, |payload| {
                let uow_factory = uow_factory.clone();
                async move {
                    let event: OrderProcessedEvent = serde_json::from_value(payload)?;
                    usecases::apply_processed(
                        &*uow_factory,
                        event.order_id,
                        event.status,
                        event.reason,
                        event.version,
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
        let uow_factory = uow_factory.clone();
        let metrics = metrics.clone();
        let registry = registry.clone();
        let service_name = cfg.service_name.clone();
        let port = cfg.http_port;
        let shutdown = shutdown.clone();
        async move {
            let server = http_edge::Server::new(uow_factory, metrics, registry, service_name, port);
            server.start(shutdown).await
        }
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

    info!("order service stopped");
    Ok(())
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
