//! Opaque pagination cursor: `(broadcaster_id, year_month, timestamp_ms,
//! message_id)`, joined by single spaces and base62-encoded (§4.10, §3 V4).

use uuid::Uuid;

use crate::base62;
use crate::datetime::get_month;
use crate::error::{IngestorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub broadcaster_id: u64,
    pub year_month: u32,
    pub timestamp_ms: i64,
    pub message_id: Uuid,
}

impl Cursor {
    pub fn new(broadcaster_id: u64, timestamp_ms: i64, message_id: Uuid) -> Self {
        Self {
            broadcaster_id,
            year_month: get_month(timestamp_ms),
            timestamp_ms,
            message_id,
        }
    }

    /// Encode as `base62("broadcaster_id year_month timestamp_ms message_id")`.
    pub fn encode(&self) -> String {
        let key = format!(
            "{} {} {} {}",
            self.broadcaster_id, self.year_month, self.timestamp_ms, self.message_id
        );
        base62::encode(&key)
    }

    /// Decode and validate a cursor string against the broadcaster id the
    /// request was made for. Rejects malformed cursors and cursors whose
    /// `year_month` doesn't match `get_month(timestamp_ms)` (invariant V4).
    pub fn decode_for_broadcaster(encoded: &str, expected_broadcaster_id: u64) -> Result<Self> {
        let key = base62::decode(encoded)
            .ok_or_else(|| IngestorError::InvalidCursor("malformed base62 cursor".into()))?;

        let mut parts = key.split(' ');
        let broadcaster_id: u64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IngestorError::InvalidCursor("missing broadcaster_id".into()))?;
        let year_month: u32 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IngestorError::InvalidCursor("missing year_month".into()))?;
        let timestamp_ms: i64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IngestorError::InvalidCursor("missing timestamp".into()))?;
        let message_id: Uuid = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IngestorError::InvalidCursor("missing message_id".into()))?;
        if parts.next().is_some() {
            return Err(IngestorError::InvalidCursor("trailing cursor fields".into()));
        }

        if broadcaster_id != expected_broadcaster_id {
            return Err(IngestorError::InvalidCursor(
                "cursor broadcaster_id does not match request".into(),
            ));
        }
        if get_month(timestamp_ms) != year_month {
            return Err(IngestorError::InvalidCursor(
                "cursor year_month does not match timestamp".into(),
            ));
        }

        Ok(Self {
            broadcaster_id,
            year_month,
            timestamp_ms,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Cursor {
        Cursor::new(
            42,
            1704067200000,
            "33569d6a-8a67-4e48-aa55-b11bf86e2268".parse().unwrap(),
        )
    }

    #[test]
    fn round_trips_a_valid_cursor() {
        let cursor = sample();
        let encoded = cursor.encode();
        let decoded = Cursor::decode_for_broadcaster(&encoded, 42).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn rejects_mismatched_broadcaster_id() {
        let encoded = sample().encode();
        assert!(Cursor::decode_for_broadcaster(&encoded, 43).is_err());
    }

    #[test]
    fn rejects_tampered_year_month() {
        // Flip year_month to 202402 while keeping the same January timestamp.
        let tampered = format!(
            "{} {} {} {}",
            42, 202402, 1704067200000i64, "33569d6a-8a67-4e48-aa55-b11bf86e2268"
        );
        let encoded = base62::encode(&tampered);
        assert!(Cursor::decode_for_broadcaster(&encoded, 42).is_err());
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(Cursor::decode_for_broadcaster("not-base62!!", 42).is_err());
    }
}
