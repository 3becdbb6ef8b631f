//! Live-streamer poller: scheduled fetch of the currently-live list, a
//! one-time clip-capability probe per streamer, and ordered publication to
//! `broadcaster_fanout` (§4.4).

mod platform;

use std::collections::HashMap;
use std::time::Duration;

use ingestor_bus::{publish_json, AmqpBus, Topic};
use ingestor_config::{BrokerSettings, PlatformSettings, PollerSettings};
use ingestor_core::BroadcasterEvent;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::platform::{HttpPlatformClient, PlatformClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let broker = BrokerSettings::from_env()?;
    let platform_settings = PlatformSettings::from_env()?;
    let poller = PollerSettings::from_env()?;

    let bus = AmqpBus::connect(&broker.amqp_url).await?;
    let platform = HttpPlatformClient::new(&platform_settings);

    // Bloom-filter-style "classified once" memory: once a streamer is known
    // to disallow clipping there is no point asking again this process
    // lifetime (§4.4 step 2).
    let mut clip_capability: HashMap<u64, bool> = HashMap::new();

    let mut interval = tokio::time::interval(Duration::from_secs(poller.poll_interval_seconds));

    info!("live-streamer poller ready");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = poll_once(&platform, &bus, &mut clip_capability, poller.max_streamers).await {
                    warn!(%err, "poll cycle failed");
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

async fn poll_once(
    platform: &HttpPlatformClient,
    bus: &AmqpBus,
    clip_capability: &mut HashMap<u64, bool>,
    max_streamers: u32,
) -> anyhow::Result<()> {
    let streamers = platform.list_live_streamers(max_streamers).await?;
    info!(count = streamers.len(), "polled live streamers");

    let mut rank = 0u32;
    for streamer in streamers {
        if !clip_capability.contains_key(&streamer.id) {
            match platform.probe_clip_capability(streamer.id).await {
                Ok(allowed) => {
                    clip_capability.insert(streamer.id, allowed);
                }
                Err(err) => {
                    warn!(streamer_id = streamer.id, %err, "clip-capability probe failed, will retry next poll");
                }
            }
        }

        // Streamers known to disallow clipping are skipped entirely, not
        // just re-probed (§4.4 step 2).
        if clip_capability.get(&streamer.id) == Some(&false) {
            continue;
        }

        let event = BroadcasterEvent {
            id: streamer.id,
            login: streamer.login,
            rank,
        };
        publish_json(bus, Topic::BroadcasterFanout, &event).await?;
        rank += 1;
    }

    Ok(())
}
