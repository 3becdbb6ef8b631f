//! Shared domain types and pure algorithms: the data model, the cursor
//! codec, month-bucket arithmetic, and the time-bucketed anomaly detector.
//! Every other crate in the workspace depends on this one; it has no
//! dependency of its own on any transport, storage, or config crate.

pub mod base62;
pub mod cursor;
pub mod datetime;
pub mod error;
pub mod model;
pub mod ratelimit;
pub mod stats;

pub use cursor::Cursor;
pub use error::{IngestorError, Result};
pub use model::{AnomalyEvent, BroadcasterEvent, ChatMessage, Clip, StreamerRecord};
pub use ratelimit::FixedWindowLimiter;
pub use stats::{DetectorState, Observation, TimeBucketStats};
