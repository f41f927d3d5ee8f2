//! HTTP route handlers

use super::state::ServerState;
use axum::Router;

pub mod admin;
pub mod models;
pub mod predict;

/// All service routes, state not yet attached
pub fn create_router() -> Router<ServerState> {
    Router::new()
        .merge(predict::create_router())
        .merge(admin::create_router())
        .merge(models::create_router())
}
