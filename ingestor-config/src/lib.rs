//! Typed, environment-driven configuration shared by every worker and
//! service binary (§6 EXTERNAL INTERFACES "Configuration").

pub mod error;
pub mod settings;

pub use error::{ConfigError, Result};
pub use settings::{
    BrokerSettings, ChatIngestSettings, ClipWorkerSettings, DetectorSettings, GrpcSettings,
    ListenerSettings, PlatformSettings, PollerSettings, QueryApiSettings, RateLimiterSettings,
    StorageSettings,
};
