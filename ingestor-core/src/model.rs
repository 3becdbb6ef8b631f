//! Wire/domain types produced and consumed across the pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::get_month;

/// An immutable chat event, created once by the listener and never mutated
/// downstream. Stored in `chat_by_broadcaster_and_timestamp`, partitioned by
/// `(broadcaster_id, year_month)` and clustered by `(timestamp, message_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub broadcaster_id: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message_id: Uuid,
    /// Opaque structured payload (room/user/text fields); never inspected
    /// by the analytics pipeline beyond the command-filter prefix check.
    pub message: serde_json::Value,
}

impl ChatMessage {
    /// `YYYYMM` partition component, always derivable from `timestamp`
    /// (invariant V1 — there is deliberately no stored `year_month` field).
    pub fn year_month(&self) -> u32 {
        get_month(self.timestamp)
    }

    /// The raw chat text, if the opaque `message` payload carries one under
    /// the conventional `"text"` key.
    pub fn text(&self) -> Option<&str> {
        self.message.get("text").and_then(|v| v.as_str())
    }
}

/// A platform-created clip, keyed by the anomaly's originating second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub clip_id: String,
    /// Seconds since the Unix epoch — the moment of the anomaly.
    pub timestamp: i64,
    pub embed_url: String,
    pub thumbnail_url: String,
}

/// A broadcaster id ever observed live, recorded in the relational
/// streamer registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamerRecord {
    pub streamer_id: u64,
}

/// `(broadcaster_id, login, rank)` as published on `broadcaster_fanout`.
/// `rank` is the broadcaster's position in the currently-online list for
/// that poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcasterEvent {
    pub id: u64,
    pub login: String,
    pub rank: u32,
}

/// `{broadcaster_id, timestamp}` as published on `anomaly_fanout`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub broadcaster_id: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn year_month_matches_timestamp() {
        let msg = ChatMessage {
            broadcaster_id: 42,
            timestamp: 1704067200000,
            message_id: Uuid::nil(),
            message: json!({"text": "hello"}),
        };
        assert_eq!(msg.year_month(), 202401);
        assert_eq!(msg.text(), Some("hello"));
    }
}
