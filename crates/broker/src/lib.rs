//! A thin `lapin`-based wrapper around the `orders` topic exchange shared by
//! both services: a durable topic exchange, persistent JSON messages,
//! service-scoped durable queues (`<service>.<routing_key>`), prefetch 10.

pub mod error;

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{info, instrument};

pub use error::BrokerError;

/// The single topic exchange both services publish to and consume from.
pub const EXCHANGE: &str = "orders";
/// Messages in flight per consumer before the broker waits for an ack.
pub const PREFETCH_COUNT: u16 = 10;

/// Opens a connection and a channel, using the tokio reactor/executor pair
/// `lapin` requires to run on the tokio runtime rather than its own.
#[instrument]
pub async fn connect(amqp_url: &str) -> Result<Connection, BrokerError> {
    let props = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);
    let conn = Connection::connect(amqp_url, props).await?;
    info!("connected to amqp broker");
    Ok(conn)
}

async fn declare_exchange(channel: &Channel) -> Result<(), BrokerError> {
    channel
        .exchange_declare(
            EXCHANGE,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Publishes a single persistent JSON message with `routing_key = event_type`.
/// Opens and uses its own channel on the given connection, matching the
/// reference behavior of amortizing a connection but not a channel across a
/// publish cycle (see the outbox publisher worker, which calls this once per
/// connection per tick).
#[instrument(skip(connection, payload))]
pub async fn publish<T: serde::Serialize + std::fmt::Debug>(
    connection: &Connection,
    routing_key: &str,
    payload: &T,
) -> Result<(), BrokerError> {
    let channel = connection.create_channel().await?;
    declare_exchange(&channel).await?;

    let body = serde_json::to_vec(payload)?;
    let properties = BasicProperties::default()
        .with_content_type("application/json".into())
        .with_delivery_mode(2); // persistent

    channel
        .basic_publish(
            EXCHANGE,
            routing_key,
            BasicPublishOptions::default(),
            &body,
            properties,
        )
        .await?
        .await?;

    Ok(())
}

/// Declares (if absent) and binds a durable, service-scoped queue
/// (`<service>.<routing_key>`) to [`EXCHANGE`] with `routing_key`, applies
/// [`PREFETCH_COUNT`], and returns a `lapin` consumer stream over it.
#[instrument(skip(connection))]
pub async fn consume(
    connection: &Connection,
    service_name: &str,
    routing_key: &str,
) -> Result<(Channel, lapin::Consumer), BrokerError> {
    let channel = connection.create_channel().await?;
    declare_exchange(&channel).await?;

    channel
        .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
        .await?;

    let queue_name = format!("{service_name}.{routing_key}");
    channel
        .queue_declare(
            &queue_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            &queue_name,
            EXCHANGE,
            routing_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let consumer = channel
        .basic_consume(
            &queue_name,
            &format!("{service_name}-consumer"),
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    info!(queue = %queue_name, routing_key, "subscribed to queue");
    Ok((channel, consumer))
}
