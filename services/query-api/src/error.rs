use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients (§4.9, §7 "Invalid input" / "Downstream
/// transient"). The wire shape is `{"InvalidRequest": "..."}` for 400s, not
/// the `{"error": {...}}` envelope — this API matches the spec's contract,
/// not the media server's.
#[derive(Error, Debug)]
pub enum QueryApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("downstream RPC failure: {0}")]
    Downstream(#[from] tonic::Status),
}

impl IntoResponse for QueryApiError {
    fn into_response(self) -> Response {
        match self {
            QueryApiError::InvalidRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "InvalidRequest": detail }))).into_response()
            }
            QueryApiError::Downstream(status) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "DownstreamError": status.message() })),
            )
                .into_response(),
        }
    }
}

pub type AppResult<T> = Result<T, QueryApiError>;
