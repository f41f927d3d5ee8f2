//! Health and cache management endpoints

use crate::server::state::ServerState;
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

pub fn create_router() -> Router<ServerState> {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/cache/clear", post(clear_cache))
}

#[derive(Debug, Serialize)]
struct ClearCacheResponse {
    removed_count: usize,
    memo_removed: usize,
}

/// Health check endpoint
async fn health_check(State(state): State<ServerState>) -> impl IntoResponse {
    Json(state.health())
}

/// Empty both cache layers. `removed_count` counts exact-layer entries.
async fn clear_cache(State(state): State<ServerState>) -> impl IntoResponse {
    let cleared = state.cache.clear();
    Json(ClearCacheResponse {
        removed_count: cleared.exact_removed,
        memo_removed: cleared.memo_removed,
    })
}
