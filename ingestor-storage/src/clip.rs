use ingestor_core::Clip;
use scylla::client::session::Session;

use crate::error::{Result, StorageError};

/// All clips share a single partition (§3, §6 "Storage layout").
const CLIP_PARTITION_KEY: i32 = 1;

const INSERT_CLIP_CQL: &str = "INSERT INTO clips_by_timestamp \
    (partition_key, timestamp, clip_id, embed_url, thumbnail_url) VALUES (?, ?, ?, ?, ?)";

const SELECT_CLIPS_RANGE_CQL: &str = "SELECT clip_id, timestamp, embed_url, thumbnail_url \
    FROM clips_by_timestamp WHERE partition_key = ? AND timestamp >= ? AND timestamp <= ?";

/// Wide-column adapter for `clips_by_timestamp` (§3, §4.6, §4.8).
pub struct ClipStore<'a> {
    session: &'a Session,
}

impl<'a> ClipStore<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn insert(&self, clip: &Clip) -> Result<()> {
        self.session
            .query_unpaged(
                INSERT_CLIP_CQL,
                (
                    CLIP_PARTITION_KEY,
                    clip.timestamp,
                    clip.clip_id.clone(),
                    clip.embed_url.clone(),
                    clip.thumbnail_url.clone(),
                ),
            )
            .await
            .map_err(|e| StorageError::WideColumn(e.to_string()))?;
        Ok(())
    }

    pub async fn query_range(&self, start_s: i64, end_s: i64) -> Result<Vec<Clip>> {
        let query_result = self
            .session
            .query_unpaged(
                SELECT_CLIPS_RANGE_CQL,
                (CLIP_PARTITION_KEY, start_s, end_s),
            )
            .await
            .map_err(|e| StorageError::WideColumn(e.to_string()))?;

        let rows_result = query_result
            .into_rows_result()
            .map_err(|e| StorageError::WideColumn(e.to_string()))?;
        let typed_rows = rows_result
            .rows::<(String, i64, String, String)>()
            .map_err(|e| StorageError::WideColumn(e.to_string()))?;

        let mut clips = Vec::new();
        for row in typed_rows {
            let (clip_id, timestamp, embed_url, thumbnail_url) =
                row.map_err(|e| StorageError::WideColumn(e.to_string()))?;
            clips.push(Clip {
                clip_id,
                timestamp,
                embed_url,
                thumbnail_url,
            });
        }
        Ok(clips)
    }
}
