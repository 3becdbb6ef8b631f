//! Storage adapter: a wide-column store (`scylla`) for chats and clips, and
//! a bloom-filter-gated relational streamer registry (`sqlx` Postgres)
//! (§4.6, §4.7, §3).

pub mod bloom;
pub mod chat;
pub mod clip;
pub mod error;
pub mod registry;

pub use chat::ChatStore;
pub use clip::ClipStore;
pub use error::{Result, StorageError};
pub use registry::StreamerRegistry;
