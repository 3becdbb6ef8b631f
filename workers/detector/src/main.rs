//! Anomaly-detector worker: consumes `chat_fanout` and publishes hype
//! moments to `anomaly_fanout` (§4.2).

use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use ingestor_bus::{ack, publish_json, reject_and_drop, AmqpBus, Topic};
use ingestor_config::{BrokerSettings, DetectorSettings};
use ingestor_core::{stats::is_command, AnomalyEvent, ChatMessage, DetectorState, Observation};
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "detector=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = BrokerSettings::from_env()?;
    let detector = DetectorSettings::from_env()?;

    let bus = Arc::new(AmqpBus::connect(&broker.amqp_url).await?);
    let mut consumer = bus
        .bind_queue(
            Topic::ChatFanout,
            "detector.chat_fanout",
            ingestor_bus::DEFAULT_PREFETCH,
        )
        .await?;

    let states: DashMap<u64, DetectorState> = DashMap::new();

    info!("anomaly detector ready");

    loop {
        tokio::select! {
            delivery = consumer.recv() => {
                let Some(delivery) = delivery else {
                    info!("broker consumer closed, shutting down");
                    break;
                };
                let delivery = delivery.context("broker delivery error")?;

                match handle_message(&delivery.data, &states, &detector, bus.as_ref()).await {
                    Ok(()) => {
                        if let Err(err) = ack(&delivery).await {
                            warn!(%err, "failed to ack chat message");
                        }
                    }
                    Err(HandleError::Poison(err)) => {
                        warn!(%err, "dropping unparseable chat message");
                        if let Err(err) = reject_and_drop(&delivery).await {
                            warn!(%err, "failed to reject poison message");
                        }
                    }
                    Err(HandleError::Transient(err)) => {
                        warn!(%err, "anomaly publish failed, leaving message unacked for redelivery");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

enum HandleError {
    /// The message itself cannot ever be processed; drop it.
    Poison(anyhow::Error),
    /// Processing failed downstream; redelivery may succeed later.
    Transient(anyhow::Error),
}

async fn handle_message(
    payload: &[u8],
    states: &DashMap<u64, DetectorState>,
    settings: &DetectorSettings,
    bus: &AmqpBus,
) -> Result<(), HandleError> {
    let message: ChatMessage =
        serde_json::from_slice(payload).map_err(|e| HandleError::Poison(e.into()))?;

    if message.text().is_some_and(is_command) {
        debug!(broadcaster_id = message.broadcaster_id, "dropping command message");
        return Ok(());
    }

    let ts_s = message.timestamp / 1000;

    let observation = {
        let mut state = states.entry(message.broadcaster_id).or_insert_with(|| {
            DetectorState::new(
                settings.bucket_size_seconds,
                settings.max_bucket_gap,
                settings.cooldown_seconds,
            )
        });
        state.observe(ts_s)
    };

    if let Observation::Anomaly { timestamp_seconds } = observation {
        let event = AnomalyEvent {
            broadcaster_id: message.broadcaster_id,
            timestamp: timestamp_seconds,
        };
        info!(broadcaster_id = event.broadcaster_id, timestamp = event.timestamp, "hype anomaly detected");
        publish_json(bus, Topic::AnomalyFanout, &event)
            .await
            .map_err(|e| HandleError::Transient(e.into()))?;
    }

    Ok(())
}
