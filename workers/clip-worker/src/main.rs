//! Clip-creation worker: consumes `anomaly_fanout`, defers clip request and
//! retrieval, and stores the result (§4.8).

mod platform;

use std::sync::Arc;
use std::time::Duration;

use ingestor_bus::{ack, AmqpBus, Topic};
use ingestor_config::{BrokerSettings, ClipWorkerSettings, PlatformSettings, StorageSettings};
use ingestor_core::{AnomalyEvent, Clip};
use ingestor_storage::ChatStore;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::platform::{ClipPlatform, HttpClipPlatform};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clip_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = BrokerSettings::from_env()?;
    let clip_worker = ClipWorkerSettings::from_env()?;
    let platform_settings = PlatformSettings::from_env()?;
    let storage = StorageSettings::from_env()?;

    let bus = AmqpBus::connect(&broker.amqp_url).await?;
    let mut consumer = bus
        .bind_queue(
            Topic::AnomalyFanout,
            "clip_worker.anomaly_fanout",
            ingestor_bus::DEFAULT_PREFETCH,
        )
        .await?;

    let platform = Arc::new(HttpClipPlatform::new(&platform_settings));
    let store = Arc::new(ChatStore::connect(&storage.scylla_node_list(), &storage.keyspace).await?);

    info!("clip-creation worker ready");

    loop {
        tokio::select! {
            delivery = consumer.recv() => {
                let Some(delivery) = delivery else {
                    info!("anomaly fan-out consumer closed, shutting down");
                    break;
                };
                let delivery = delivery?;

                match serde_json::from_slice::<AnomalyEvent>(&delivery.data) {
                    Ok(event) => {
                        handle_anomaly(event, clip_worker.clone(), platform.clone(), store.clone());
                    }
                    Err(err) => {
                        warn!(%err, "dropping unparseable anomaly event");
                    }
                }

                // Acknowledge regardless of clip outcome (§4.8 step 3): the
                // deferred work below runs detached from this message's
                // delivery tag.
                if let Err(err) = ack(&delivery).await {
                    warn!(%err, "failed to ack anomaly event");
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

/// Whether an anomaly at `timestamp` is still within the clip-request
/// freshness window as of `now` (§4.8 step 1).
fn is_fresh(now: i64, timestamp: i64, freshness_window_seconds: i64) -> bool {
    now - timestamp <= freshness_window_seconds
}

fn handle_anomaly(
    event: AnomalyEvent,
    settings: ClipWorkerSettings,
    platform: Arc<dyn ClipPlatform>,
    store: Arc<ChatStore>,
) {
    let now = chrono::Utc::now().timestamp();
    if !is_fresh(now, event.timestamp, settings.freshness_window_seconds) {
        warn!(
            broadcaster_id = event.broadcaster_id,
            timestamp = event.timestamp,
            "anomaly too stale for a clip, dropping"
        );
        return;
    }

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(settings.first_defer_seconds)).await;

        let clip_id = match platform.request_clip(event.broadcaster_id).await {
            Ok(id) => id,
            Err(err) => {
                warn!(broadcaster_id = event.broadcaster_id, %err, "clip request failed");
                return;
            }
        };

        tokio::time::sleep(Duration::from_secs(settings.second_defer_seconds)).await;

        let metadata = match platform.get_clip_metadata(&clip_id).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(clip_id, %err, "clip metadata retrieval failed");
                return;
            }
        };

        let clip = Clip {
            clip_id,
            timestamp: event.timestamp,
            embed_url: metadata.embed_url,
            thumbnail_url: metadata.thumbnail_url,
        };

        if let Err(err) = store.clips().insert(&clip).await {
            warn!(clip_id = clip.clip_id, %err, "failed to store clip");
        } else {
            info!(clip_id = clip.clip_id, broadcaster_id = event.broadcaster_id, "clip stored");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_window_is_fresh() {
        assert!(is_fresh(100, 95, 5));
        assert!(is_fresh(100, 100, 5));
    }

    #[test]
    fn past_window_is_stale() {
        assert!(!is_fresh(106, 100, 5));
    }
}
