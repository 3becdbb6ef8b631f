//! Typed, env-driven settings for each worker/service (§6). Every field has
//! a documented default matching spec.md §6 and can be overridden by setting
//! the corresponding environment variable.

use serde::Deserialize;

use crate::error::Result;

fn default_amqp_url() -> String {
    "amqp://127.0.0.1:5672/%2f".to_string()
}

/// Shared message-bus connection settings, loaded with no prefix so the
/// single `AMQP_URL` variable is visible to every binary.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    #[serde(default = "default_amqp_url")]
    pub amqp_url: String,
}

impl BrokerSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env::<Self>()?)
    }
}

fn default_grpc_host() -> String {
    "localhost".to_string()
}
fn default_database_grpc_port() -> u16 {
    50051
}
fn default_ratelimiter_grpc_port() -> u16 {
    50052
}

/// gRPC endpoint settings (§6: `DATABASE_GRPC_SERVER`, default `localhost`).
#[derive(Debug, Clone, Deserialize)]
pub struct GrpcSettings {
    #[serde(default = "default_grpc_host")]
    pub database_grpc_server: String,
    #[serde(default = "default_database_grpc_port")]
    pub database_grpc_port: u16,
    #[serde(default = "default_grpc_host")]
    pub ratelimiter_grpc_server: String,
    #[serde(default = "default_ratelimiter_grpc_port")]
    pub ratelimiter_grpc_port: u16,
}

impl GrpcSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env::<Self>()?)
    }

    pub fn database_grpc_addr(&self) -> String {
        format!("{}:{}", self.database_grpc_server, self.database_grpc_port)
    }

    pub fn ratelimiter_grpc_addr(&self) -> String {
        format!(
            "{}:{}",
            self.ratelimiter_grpc_server, self.ratelimiter_grpc_port
        )
    }
}

fn default_bucket_size_seconds() -> i64 {
    5
}
fn default_max_bucket_gap() -> i64 {
    60
}
fn default_cooldown_seconds() -> i64 {
    30
}

/// Anomaly-detector tunables (§4.1, §4.2, §9 "document as tunable").
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSettings {
    #[serde(default = "default_bucket_size_seconds")]
    pub bucket_size_seconds: i64,
    #[serde(default = "default_max_bucket_gap")]
    pub max_bucket_gap: i64,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
}

impl DetectorSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("DETECTOR_").from_env::<Self>()?)
    }
}

fn default_rate_limit() -> u32 {
    20
}
fn default_rate_limit_window_seconds() -> i64 {
    30
}

/// Rate-limiter tunables (§4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimiterSettings {
    #[serde(default = "default_rate_limit")]
    pub limit: u32,
    #[serde(default = "default_rate_limit_window_seconds")]
    pub window_seconds: i64,
}

impl RateLimiterSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("RATE_LIMITER_").from_env::<Self>()?)
    }
}

fn default_top_n() -> u32 {
    100
}
fn default_cache_ttl_seconds() -> u64 {
    300
}
fn default_admission_retry_seconds() -> u64 {
    300
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

/// Chat-listener tunables (§4.3).
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerSettings {
    #[serde(default = "default_top_n")]
    pub top_n: u32,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_admission_retry_seconds")]
    pub admission_retry_seconds: u64,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl ListenerSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("LISTENER_").from_env::<Self>()?)
    }
}

fn default_poll_interval_seconds() -> u64 {
    120
}
fn default_max_streamers() -> u32 {
    100
}

/// Live-streamer poller tunables (§4.4).
#[derive(Debug, Clone, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_max_streamers")]
    pub max_streamers: u32,
}

impl PollerSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("POLLER_").from_env::<Self>()?)
    }
}

fn default_freshness_window_seconds() -> i64 {
    5
}
fn default_first_defer_seconds() -> u64 {
    5
}
fn default_second_defer_seconds() -> u64 {
    15
}

/// Clip-creation worker tunables (§4.8, §9 clip-freshness open question —
/// resolved to 5s, see DESIGN.md).
#[derive(Debug, Clone, Deserialize)]
pub struct ClipWorkerSettings {
    #[serde(default = "default_freshness_window_seconds")]
    pub freshness_window_seconds: i64,
    #[serde(default = "default_first_defer_seconds")]
    pub first_defer_seconds: u64,
    #[serde(default = "default_second_defer_seconds")]
    pub second_defer_seconds: u64,
}

impl ClipWorkerSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("CLIP_WORKER_").from_env::<Self>()?)
    }
}

fn default_chat_ingest_batch_max_size() -> usize {
    500
}
fn default_chat_ingest_flush_interval_ms() -> u64 {
    2000
}

/// Chat-ingestion worker tunables: how eagerly inbound chat messages are
/// flushed to the wide-column store (§4.6 batching).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatIngestSettings {
    #[serde(default = "default_chat_ingest_batch_max_size")]
    pub batch_max_size: usize,
    #[serde(default = "default_chat_ingest_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl ChatIngestSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("CHAT_INGEST_").from_env::<Self>()?)
    }
}

fn default_scylla_nodes() -> String {
    "127.0.0.1:9042".to_string()
}
fn default_keyspace() -> String {
    "ingestor".to_string()
}
fn default_database_url() -> String {
    "postgres://localhost/ingestor".to_string()
}
fn default_bloom_expected_items() -> u64 {
    10_000_000
}
fn default_bloom_false_positive_rate() -> f64 {
    0.001
}

/// Storage adapter settings: wide-column cluster, relational registry, and
/// the bloom filter gating registry writes (§3 "Streamer registry").
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_scylla_nodes")]
    pub scylla_nodes: String,
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_bloom_expected_items")]
    pub bloom_expected_items: u64,
    #[serde(default = "default_bloom_false_positive_rate")]
    pub bloom_false_positive_rate: f64,
}

impl StorageSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("STORAGE_").from_env::<Self>()?)
    }

    /// Parsed known-node list for `scylla::SessionBuilder::known_nodes`.
    pub fn scylla_node_list(&self) -> Vec<String> {
        self.scylla_nodes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn default_platform_base_url() -> String {
    "https://api.twitch.tv/helix".to_string()
}

/// Streaming-platform API credentials, shared by the poller and the
/// listener (§4.3, §4.4).
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSettings {
    #[serde(default = "default_platform_base_url")]
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl PlatformSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("PLATFORM_").from_env::<Self>()?)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_query_limit() -> u32 {
    20
}
fn default_query_max_limit() -> u32 {
    100
}

/// HTTP query API settings (§4.9).
#[derive(Debug, Clone, Deserialize)]
pub struct QueryApiSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_query_limit")]
    pub default_limit: u32,
    #[serde(default = "default_query_max_limit")]
    pub max_limit: u32,
}

impl QueryApiSettings {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("QUERY_API_").from_env::<Self>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_environment() {
        // envy::prefixed still requires zero matching vars to succeed as
        // long as every field has a serde default, which all settings here
        // do.
        let detector = DetectorSettings::from_env().unwrap();
        assert_eq!(detector.bucket_size_seconds, 5);
        assert_eq!(detector.max_bucket_gap, 60);
        assert_eq!(detector.cooldown_seconds, 30);

        let grpc = GrpcSettings::from_env().unwrap();
        assert_eq!(grpc.database_grpc_server, "localhost");
        assert_eq!(grpc.database_grpc_addr(), "localhost:50051");
    }
}
