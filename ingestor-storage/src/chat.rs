use std::collections::HashMap;

use ingestor_core::ChatMessage;
use ingestor_core::datetime::{get_month, get_next_month};
use scylla::batch::{Batch, BatchType};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::Consistency;

use crate::clip::ClipStore;
use crate::error::{Result, StorageError};

/// Chat inserts never batch more than this many rows per request (§4.6).
const MAX_BATCH_ROWS: usize = 1000;

const INSERT_CHAT_CQL: &str = "INSERT INTO chat_by_broadcaster_and_timestamp \
    (broadcaster_id, year_month, timestamp, message_id, message) VALUES (?, ?, ?, ?, ?)";

const SELECT_CHAT_RANGE_CQL: &str = "SELECT broadcaster_id, timestamp, message_id, message \
    FROM chat_by_broadcaster_and_timestamp \
    WHERE broadcaster_id = ? AND year_month = ? AND timestamp >= ? AND timestamp <= ? \
    LIMIT ?";

/// Wide-column adapter for `chat_by_broadcaster_and_timestamp` (§3, §4.6).
pub struct ChatStore {
    session: Session,
}

impl ChatStore {
    pub async fn connect(nodes: &[String], keyspace: &str) -> Result<Self> {
        let session = SessionBuilder::new()
            .known_nodes(nodes)
            .use_keyspace(keyspace, false)
            .build()
            .await
            .map_err(|e| StorageError::WideColumn(e.to_string()))?;
        Ok(Self { session })
    }

    /// The `clips_by_timestamp` adapter sharing this store's session — one
    /// storage session is opened per process (§5 "Resource policy").
    pub fn clips(&self) -> ClipStore<'_> {
        ClipStore::new(&self.session)
    }

    /// Batched insert, grouped by partition key `(broadcaster_id,
    /// year_month)` and chunked to at most 1000 rows per unlogged,
    /// quorum-consistency batch.
    pub async fn insert_batch(&self, messages: &[ChatMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut groups: HashMap<(u64, u32), Vec<&ChatMessage>> = HashMap::new();
        for message in messages {
            groups
                .entry((message.broadcaster_id, message.year_month()))
                .or_default()
                .push(message);
        }

        for ((broadcaster_id, year_month), rows) in groups {
            for chunk in rows.chunks(MAX_BATCH_ROWS) {
                let mut batch = Batch::new(BatchType::Unlogged);
                batch.set_consistency(Consistency::Quorum);
                let mut values = Vec::with_capacity(chunk.len());
                for message in chunk {
                    batch.append_statement(INSERT_CHAT_CQL);
                    values.push((
                        broadcaster_id as i64,
                        year_month as i32,
                        message.timestamp,
                        message.message_id,
                        message.message.to_string(),
                    ));
                }
                self.session
                    .batch(&batch, values)
                    .await
                    .map_err(|e| StorageError::WideColumn(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Multi-partition range scan, advancing partition-by-partition from
    /// `get_month(start_ms)` to `get_month(end_ms)` until `limit` rows are
    /// collected (§4.6).
    pub async fn query_range(
        &self,
        broadcaster_id: u64,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<ChatMessage>> {
        let mut collected = Vec::new();
        let end_month = get_month(end_ms);
        let mut month = get_month(start_ms);

        loop {
            if collected.len() as u32 >= limit || month > end_month {
                break;
            }
            let remaining = limit - collected.len() as u32;

            let query_result = self
                .session
                .query_unpaged(
                    SELECT_CHAT_RANGE_CQL,
                    (
                        broadcaster_id as i64,
                        month as i32,
                        start_ms,
                        end_ms,
                        remaining as i32,
                    ),
                )
                .await
                .map_err(|e| StorageError::WideColumn(e.to_string()))?;

            let rows_result = query_result
                .into_rows_result()
                .map_err(|e| StorageError::WideColumn(e.to_string()))?;
            let typed_rows = rows_result
                .rows::<(i64, i64, uuid::Uuid, String)>()
                .map_err(|e| StorageError::WideColumn(e.to_string()))?;

            for row in typed_rows {
                let (raw_broadcaster_id, timestamp, message_id, message) =
                    row.map_err(|e| StorageError::WideColumn(e.to_string()))?;
                collected.push(ChatMessage {
                    broadcaster_id: raw_broadcaster_id as u64,
                    timestamp,
                    message_id,
                    message: serde_json::from_str(&message).unwrap_or(serde_json::Value::Null),
                });
            }

            month = get_next_month(month);
        }

        Ok(collected)
    }
}
