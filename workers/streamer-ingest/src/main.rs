//! Broadcaster-id ingestion worker: consumes `broadcaster_fanout` and
//! records every distinct broadcaster id ever seen live in the relational
//! streamer registry (§2, §3 "Streamer registry").

use ingestor_bus::{ack, reject_and_drop, AmqpBus, Topic};
use ingestor_config::{BrokerSettings, StorageSettings};
use ingestor_core::BroadcasterEvent;
use ingestor_storage::StreamerRegistry;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamer_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = BrokerSettings::from_env()?;
    let storage = StorageSettings::from_env()?;

    let bus = AmqpBus::connect(&broker.amqp_url).await?;
    let mut consumer = bus
        .bind_queue(
            Topic::BroadcasterFanout,
            "streamer_ingest.broadcaster_fanout",
            ingestor_bus::DEFAULT_PREFETCH,
        )
        .await?;

    let registry = StreamerRegistry::connect(
        &storage.database_url,
        storage.bloom_expected_items,
        storage.bloom_false_positive_rate,
    )
    .await?;
    registry.run_migrations().await?;

    info!("streamer-ingestion worker ready");

    loop {
        tokio::select! {
            delivery = consumer.recv() => {
                let Some(delivery) = delivery else {
                    info!("broadcaster fan-out consumer closed, shutting down");
                    break;
                };
                let delivery = delivery?;

                match serde_json::from_slice::<BroadcasterEvent>(&delivery.data) {
                    Ok(event) => match registry.observe(event.id).await {
                        Ok(()) => {
                            if let Err(err) = ack(&delivery).await {
                                warn!(%err, "failed to ack broadcaster event");
                            }
                        }
                        Err(err) => {
                            warn!(%err, streamer_id = event.id, "registry write failed, leaving unacked");
                        }
                    },
                    Err(err) => {
                        warn!(%err, "dropping unparseable broadcaster event");
                        if let Err(err) = reject_and_drop(&delivery).await {
                            warn!(%err, "failed to reject poison message");
                        }
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
