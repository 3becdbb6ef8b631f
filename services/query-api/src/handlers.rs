use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use ingestor_core::cursor::Cursor;
use ingestor_proto::chatdb::{GetChatsRequest, GetClipsRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppResult, QueryApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub start: String,
    pub end: String,
    pub after: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessageJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageJson {
    pub broadcaster_id: u64,
    pub timestamp: i64,
    pub message_id: Uuid,
    pub message: serde_json::Value,
}

fn parse_instant(field: &str, value: &str) -> AppResult<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .map_err(|_| QueryApiError::InvalidRequest(format!("{field} is not a valid ISO-8601 instant")))
}

/// `GET /v1.0/{broadcaster_id}/chat?start&end&after?&limit?` (§4.9).
pub async fn get_chat(
    State(mut state): State<AppState>,
    Path(broadcaster_id): Path<u64>,
    Query(params): Query<ChatQuery>,
) -> AppResult<Json<ChatResponse>> {
    let mut start_ms = parse_instant("start", &params.start)?;
    let end_ms = parse_instant("end", &params.end)?;

    if let Some(after) = params.after.as_deref() {
        let cursor = Cursor::decode_for_broadcaster(after, broadcaster_id)
            .map_err(|e| QueryApiError::InvalidRequest(e.to_string()))?;
        start_ms = cursor.timestamp_ms;
    }

    let limit = params
        .limit
        .unwrap_or(state.settings.default_limit)
        .clamp(1, state.settings.max_limit);

    let response = state
        .chatdb
        .get_chats(GetChatsRequest {
            broadcaster_id,
            start_ms,
            end_ms,
            limit: limit + 1,
        })
        .await?
        .into_inner();

    let mut rows: Vec<ChatMessageJson> = response
        .chats
        .into_iter()
        .map(|c| ChatMessageJson {
            broadcaster_id: c.broadcaster_id,
            timestamp: c.timestamp,
            message_id: c.message_id.parse().unwrap_or(Uuid::nil()),
            message: serde_json::from_str(&c.message_json).unwrap_or(serde_json::Value::Null),
        })
        .collect();

    if rows.len() as u32 <= limit {
        return Ok(Json(ChatResponse {
            messages: rows,
            cursor: None,
        }));
    }

    let look_ahead = rows.remove(limit as usize);
    let cursor = Cursor::new(broadcaster_id, look_ahead.timestamp, look_ahead.message_id).encode();
    Ok(Json(ChatResponse {
        messages: rows,
        cursor: Some(cursor),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ClipQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct ClipResponse {
    pub clip_urls: Vec<String>,
}

/// `GET /v1.0/clip?start&end` (§4.9).
pub async fn get_clips(
    State(mut state): State<AppState>,
    Query(params): Query<ClipQuery>,
) -> AppResult<Json<ClipResponse>> {
    let start_s = parse_instant("start", &params.start)? / 1000;
    let end_s = parse_instant("end", &params.end)? / 1000;

    let response = state
        .chatdb
        .get_clips(GetClipsRequest { start_s, end_s })
        .await?
        .into_inner();

    let clip_urls = response.clips.into_iter().map(|c| c.embed_url).collect();
    Ok(Json(ClipResponse { clip_urls }))
}
