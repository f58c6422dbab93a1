use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("failed to encode message body: {0}")]
    Encode(#[from] serde_json::Error),
}
