//! The broker consumer worker (§4.5): generic over the per-service handler
//! that decodes a payload and invokes the corresponding inbox-guarded use
//! case. Acks on success; nacks-with-requeue on failure so the broker
//! redelivers later and the inbox absorbs the eventual replay.

use std::future::Future;

use futures_lite::stream::StreamExt;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use lapin::Consumer;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn run<F, Fut>(
    mut consumer: Consumer,
    shutdown: CancellationToken,
    mut handle: F,
) where
    F: FnMut(serde_json::Value) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("consumer shutting down");
                break;
            }
            next = consumer.next() => {
                let Some(delivery) = next else {
                    warn!("consumer stream ended");
                    break;
                };
                let delivery = match delivery {
                    Ok(delivery) => delivery,
                    Err(e) => {
                        error!(error = %e, "failed to receive delivery");
                        continue;
                    }
                };

                let payload: serde_json::Value = match serde_json::from_slice(&delivery.data) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!(error = %e, "malformed message body, nacking without requeue");
                        let _ = delivery
                            .nack(BasicNackOptions { requeue: false, ..Default::default() })
                            .await;
                        continue;
                    }
                };

                match handle(payload).await {
                    Ok(()) => {
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            error!(error = %e, "failed to ack delivery");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "use case failed, nacking for redelivery");
                        if let Err(e) = delivery
                            .nack(BasicNackOptions { requeue: true, ..Default::default() })
                            .await
                        {
                            error!(error = %e, "failed to nack delivery");
                        }
                    }
                }
            }
        }
    }
}
