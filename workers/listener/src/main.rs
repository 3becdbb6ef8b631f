//! Chat-listener worker: holds the platform chat session, admits and
//! evicts rooms against the live broadcaster fan-out, and republishes
//! validated chat messages to `chat_fanout` (§4.3).

mod cache;
mod platform;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use ingestor_bus::{ack, publish_json, AmqpBus, QueueConsumer, Topic};
use ingestor_config::{BrokerSettings, GrpcSettings, ListenerSettings, PlatformSettings};
use ingestor_core::{BroadcasterEvent, ChatMessage};
use ingestor_proto::ratelimiter::rate_limiter_client::RateLimiterClient;
use ingestor_proto::ratelimiter::ConsumeTokenRequest;
use serde_json::json;
use tokio::sync::Mutex;
use tonic::transport::Channel;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use crate::cache::{ExpirySubscriber, OnlineCache};
use crate::platform::{PlatformReader, PlatformWriter};

/// The platform's IRC-style chat endpoint. Fixed by the platform, not a
/// per-deployment setting.
const PLATFORM_CHAT_ADDR: &str = "irc.chat.twitch.tv:6667";

type OnlineStreamers = Arc<Mutex<HashSet<String>>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listener=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = BrokerSettings::from_env()?;
    let grpc = GrpcSettings::from_env()?;
    let listener = ListenerSettings::from_env()?;
    let platform_settings = PlatformSettings::from_env()?;

    let bus = Arc::new(AmqpBus::connect(&broker.amqp_url).await?);
    let cache = Arc::new(OnlineCache::connect(&listener.redis_url, listener.cache_ttl_seconds).await?);
    let rate_limiter =
        RateLimiterClient::connect(format!("http://{}", grpc.ratelimiter_grpc_addr())).await?;

    let (writer, reader) =
        platform::connect(PLATFORM_CHAT_ADDR, &platform_settings.client_id, &platform_settings.client_secret)
            .await?;
    let writer = Arc::new(writer);

    let online_streamers: OnlineStreamers = Arc::new(Mutex::new(HashSet::new()));

    // Publishes are serialized by a second mutex independent of the
    // platform-write mutex (§4.9): the bus's channel is not safe for
    // concurrent writers either.
    let publish_lock = Arc::new(Mutex::new(()));

    let eviction_task = tokio::spawn(run_eviction_loop(
        listener.redis_url.clone(),
        online_streamers.clone(),
        writer.clone(),
    ));
    let chat_task = tokio::spawn(run_chat_loop(
        reader,
        bus.clone(),
        publish_lock.clone(),
    ));

    let admission_result = run_admission_loop(
        &bus,
        writer,
        cache,
        rate_limiter,
        online_streamers,
        listener.top_n,
        listener.admission_retry_seconds,
    )
    .await;

    eviction_task.abort();
    chat_task.abort();
    admission_result
}

/// §4.3 admission path: consumes `broadcaster_fanout` and joins newly
/// admitted rooms.
async fn run_admission_loop(
    bus: &AmqpBus,
    writer: Arc<PlatformWriter>,
    cache: Arc<OnlineCache>,
    mut rate_limiter: RateLimiterClient<Channel>,
    online_streamers: OnlineStreamers,
    top_n: u32,
    admission_retry_seconds: u64,
) -> anyhow::Result<()> {
    let mut consumer: QueueConsumer = bus
        .bind_queue(
            Topic::BroadcasterFanout,
            "listener.broadcaster_fanout",
            ingestor_bus::DEFAULT_PREFETCH,
        )
        .await?;

    info!("chat listener ready, awaiting broadcaster fan-out");

    loop {
        tokio::select! {
            delivery = consumer.recv() => {
                let Some(delivery) = delivery else {
                    info!("broadcaster fan-out consumer closed, shutting down");
                    break;
                };
                let delivery = delivery?;

                let event: BroadcasterEvent = match serde_json::from_slice(&delivery.data) {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(%err, "dropping unparseable broadcaster event");
                        ingestor_bus::reject_and_drop(&delivery).await.ok();
                        continue;
                    }
                };

                handle_broadcaster_event(
                    event,
                    &writer,
                    &cache,
                    &mut rate_limiter,
                    &online_streamers,
                    top_n,
                    admission_retry_seconds,
                )
                .await;

                if let Err(err) = ack(&delivery).await {
                    warn!(%err, "failed to ack broadcaster event");
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

async fn handle_broadcaster_event(
    event: BroadcasterEvent,
    writer: &PlatformWriter,
    cache: &OnlineCache,
    rate_limiter: &mut RateLimiterClient<Channel>,
    online_streamers: &OnlineStreamers,
    top_n: u32,
    admission_retry_seconds: u64,
) {
    let already_online = online_streamers.lock().await.contains(&event.login);

    if !already_online && event.rank < top_n {
        match request_token_with_retry(rate_limiter, &event.login, admission_retry_seconds).await {
            true => {
                online_streamers.lock().await.insert(event.login.clone());
                if let Err(err) = cache.mark_online(&event.login).await {
                    warn!(login = %event.login, %err, "failed to set presence cache key");
                }
                if let Err(err) = writer.join_room(&event.login).await {
                    warn!(login = %event.login, %err, "failed to join chat room");
                }
            }
            false => {
                warn!(login = %event.login, "rate-limiter admission timed out, skipping");
            }
        }
    }

    // Always refresh TTL: keeps currently-online streamers from expiring
    // out of the cache while they keep appearing in the poll (§4.3).
    if let Err(err) = cache.refresh(&event.login).await {
        debug!(login = %event.login, %err, "TTL refresh skipped, key not yet present");
    }
}

/// Poll the rate limiter once a second for up to `admission_retry_seconds`,
/// returning `true` on the first granted token.
async fn request_token_with_retry(
    rate_limiter: &mut RateLimiterClient<Channel>,
    login: &str,
    admission_retry_seconds: u64,
) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(admission_retry_seconds);
    loop {
        let now = chrono::Utc::now().timestamp();
        let response = rate_limiter
            .consume_token(ConsumeTokenRequest {
                id: login.to_string(),
                timestamp_s: now,
            })
            .await;

        match response {
            Ok(resp) if resp.into_inner().success => return true,
            Ok(_) => {}
            Err(err) => warn!(login, %err, "rate-limiter RPC failed, retrying"),
        }

        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// §4.3 eviction path: background subscriber for cache-expiry events.
async fn run_eviction_loop(
    redis_url: String,
    online_streamers: OnlineStreamers,
    writer: Arc<PlatformWriter>,
) {
    let mut subscriber = match ExpirySubscriber::connect(&redis_url).await {
        Ok(s) => s,
        Err(err) => {
            warn!(%err, "failed to start eviction subscriber");
            return;
        }
    };

    while let Some(login) = subscriber.next_expired_login().await {
        online_streamers.lock().await.remove(&login);
        if let Err(err) = writer.leave_room(&login).await {
            warn!(%login, %err, "failed to leave chat room on eviction");
        } else {
            info!(%login, "evicted offline streamer");
        }
    }
}

/// §4.3 message path: validate and normalize each inbound chat line, then
/// publish it to `chat_fanout`.
async fn run_chat_loop(
    mut reader: PlatformReader,
    bus: Arc<AmqpBus>,
    publish_lock: Arc<Mutex<()>>,
) {
    loop {
        let raw = match reader.recv().await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("platform session closed, chat loop exiting");
                break;
            }
            Err(err) => {
                warn!(%err, "platform session read error, chat loop exiting");
                break;
            }
        };

        let Some(message) = validate_and_normalize(raw) else {
            continue;
        };

        let _guard = publish_lock.lock().await;
        if let Err(err) = publish_json(bus.as_ref(), Topic::ChatFanout, &message).await {
            warn!(%err, "failed to publish chat message");
        }
    }
}

/// Validation: id is a UUID, timestamp > 0, room id > 0, user present
/// (§4.3 "Message path").
fn validate_and_normalize(raw: platform::RawChatMessage) -> Option<ChatMessage> {
    let message_id = raw.id.as_deref().and_then(|id| Uuid::parse_str(id).ok())?;
    let timestamp = raw.timestamp.filter(|&ts| ts > 0)?;
    let room_id = raw.room_id.filter(|&id| id > 0)?;
    let user = raw.user?;

    Some(ChatMessage {
        broadcaster_id: room_id as u64,
        timestamp,
        message_id,
        message: json!({ "user": user, "text": raw.text.unwrap_or_default() }),
    })
}
