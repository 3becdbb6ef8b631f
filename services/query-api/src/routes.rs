use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{get_chat, get_clips};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1.0/{broadcaster_id}/chat", get(get_chat))
        .route("/v1.0/clip", get(get_clips))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
