//! Shared per-login TTL cache (§4.3 "State"). Backed by Redis keyspace
//! notifications: expiry of an `online:{login}` key is how the listener
//! learns a streamer went offline without polling for it.

use futures_util::StreamExt;
use redis::AsyncCommands;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type Result<T> = std::result::Result<T, CacheError>;

const KEY_PREFIX: &str = "online:";

/// Handle for setting and refreshing TTL-backed presence keys.
pub struct OnlineCache {
    conn: redis::aio::ConnectionManager,
    ttl_seconds: u64,
}

impl OnlineCache {
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, ttl_seconds })
    }

    /// Set `login`'s presence key, starting its TTL (§4.3 admission path).
    pub async fn mark_online(&self, login: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(format!("{KEY_PREFIX}{login}"), "", self.ttl_seconds)
            .await?;
        Ok(())
    }

    /// Push `login`'s TTL back out to the full window (§4.3 "always:
    /// refresh TTL on the cache key").
    pub async fn refresh(&self, login: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: bool = conn
            .expire(format!("{KEY_PREFIX}{login}"), self.ttl_seconds as i64)
            .await?;
        Ok(())
    }
}

/// A dedicated subscription to the Redis keyspace-notification channel for
/// expired keys. Requires the server configured with
/// `notify-keyspace-events Ex` (an operational prerequisite, not something
/// this client can set remotely).
pub struct ExpirySubscriber {
    pubsub: redis::aio::PubSub,
}

impl ExpirySubscriber {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.psubscribe("__keyevent@*__:expired").await?;
        Ok(Self { pubsub })
    }

    /// Await the next expired `online:{login}` key, skipping notifications
    /// for unrelated keys.
    pub async fn next_expired_login(&mut self) -> Option<String> {
        loop {
            let msg = self.pubsub.on_message().next().await?;
            let key: String = msg.get_payload().ok()?;
            if let Some(login) = key.strip_prefix(KEY_PREFIX) {
                return Some(login.to_string());
            }
        }
    }
}
