//! Prediction endpoint

use crate::server::{
    orchestrator::{Outcome, PredictionResponse, ResponseStatus},
    state::ServerState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

pub fn create_router() -> Router<ServerState> {
    Router::new().route("/predict", post(predict))
}

/// Run one prediction.
///
/// The body is parsed here rather than through the `Json` extractor so that
/// unparseable input still gets the regular response shape.
async fn predict(State(state): State<ServerState>, body: Bytes) -> Response {
    let started = Instant::now();
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            debug!("Rejecting unparseable prediction body: {}", e);
            state.metrics.record(Outcome::Rejected, started.elapsed());
            let response = PredictionResponse {
                prediction: state.orchestrator.fallback_value(),
                process_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                status: ResponseStatus::Error,
                cached: false,
                message: Some(format!("invalid JSON: {}", e)),
            };
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let response = state.orchestrator.handle_predict(&payload).await;
    let code = if response.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    (code, Json(response)).into_response()
}
