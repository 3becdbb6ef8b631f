//! Chat-ingestion worker: consumes `chat_fanout` and flushes batched
//! writes into the wide-column chat store (§4.6).

use std::time::Duration;

use ingestor_bus::{ack, reject_and_drop, AmqpBus, Topic};
use ingestor_config::{BrokerSettings, ChatIngestSettings, StorageSettings};
use ingestor_core::ChatMessage;
use ingestor_storage::ChatStore;
use lapin::message::Delivery;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = BrokerSettings::from_env()?;
    let ingest = ChatIngestSettings::from_env()?;
    let storage = StorageSettings::from_env()?;

    // This consumer batches acks, so it needs more than one delivery in
    // flight at a time for `batch_max_size` to ever be reached (§4.6).
    let prefetch = ingest.batch_max_size.min(u16::MAX as usize) as u16;

    let bus = AmqpBus::connect(&broker.amqp_url).await?;
    let mut consumer = bus
        .bind_queue(Topic::ChatFanout, "chat_ingest.chat_fanout", prefetch)
        .await?;
    let store = ChatStore::connect(&storage.scylla_node_list(), &storage.keyspace).await?;

    let mut pending_messages: Vec<ChatMessage> = Vec::with_capacity(ingest.batch_max_size);
    let mut pending_deliveries: Vec<Delivery> = Vec::with_capacity(ingest.batch_max_size);
    let mut flush_tick = tokio::time::interval(Duration::from_millis(ingest.flush_interval_ms));

    info!("chat-ingestion worker ready");

    loop {
        tokio::select! {
            delivery = consumer.recv() => {
                let Some(delivery) = delivery else {
                    info!("chat fan-out consumer closed, flushing and shutting down");
                    flush(&store, &mut pending_messages, &mut pending_deliveries).await;
                    break;
                };
                let delivery = delivery?;

                match serde_json::from_slice::<ChatMessage>(&delivery.data) {
                    Ok(message) => {
                        pending_messages.push(message);
                        pending_deliveries.push(delivery);
                        if pending_messages.len() >= ingest.batch_max_size {
                            flush(&store, &mut pending_messages, &mut pending_deliveries).await;
                        }
                    }
                    Err(err) => {
                        warn!(%err, "dropping unparseable chat message");
                        if let Err(err) = reject_and_drop(&delivery).await {
                            warn!(%err, "failed to reject poison message");
                        }
                    }
                }
            }
            _ = flush_tick.tick() => {
                flush(&store, &mut pending_messages, &mut pending_deliveries).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, flushing pending batch");
                flush(&store, &mut pending_messages, &mut pending_deliveries).await;
                break;
            }
        }
    }

    Ok(())
}

/// Insert the pending batch and ack every delivery only once the write
/// succeeds; on failure the deliveries stay unacked for redelivery (§4.6
/// "the caller decides retry").
async fn flush(store: &ChatStore, messages: &mut Vec<ChatMessage>, deliveries: &mut Vec<Delivery>) {
    if messages.is_empty() {
        return;
    }

    match store.insert_batch(messages).await {
        Ok(()) => {
            for delivery in deliveries.iter() {
                if let Err(err) = ack(delivery).await {
                    warn!(%err, "failed to ack chat message after batch insert");
                }
            }
            info!(count = messages.len(), "flushed chat batch");
        }
        Err(err) => {
            warn!(%err, count = messages.len(), "batch insert failed, leaving messages unacked");
        }
    }

    messages.clear();
    deliveries.clear();
}
