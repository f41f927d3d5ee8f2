//! Model diagnostics and emission insight endpoints

use crate::models::{rating::eco_tips, EmissionRating};
use crate::server::state::ServerState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn create_router() -> Router<ServerState> {
    Router::new()
        .route("/model", get(model_info))
        .route("/insights", get(insights))
}

#[derive(Debug, Deserialize)]
struct InsightsQuery {
    value: f64,
}

#[derive(Debug, Serialize)]
struct InsightsResponse {
    value: f64,
    rating: EmissionRating,
    tips: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_emission: Option<f64>,
}

/// Describe the loaded model
async fn model_info(State(state): State<ServerState>) -> impl IntoResponse {
    let Some(predictor) = state.lifecycle.predictor() else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "status": "initializing",
                "model_state": state.lifecycle.state(),
            })),
        )
            .into_response();
    };

    let info = predictor.info();
    let importance: serde_json::Map<String, serde_json::Value> = info
        .feature_importance
        .iter()
        .map(|(name, weight)| (name.to_string(), serde_json::json!(weight)))
        .collect();

    Json(serde_json::json!({
        "status": "ready",
        "kind": info.kind,
        "origin": state.lifecycle.origin(),
        "quality_score": info.quality_score.or(state.lifecycle.quality_score()),
        "mean_emission": info.mean_emission,
        "feature_importance": importance,
    }))
    .into_response()
}

/// Rate an emission value and suggest improvements
async fn insights(
    State(state): State<ServerState>,
    Query(query): Query<InsightsQuery>,
) -> impl IntoResponse {
    if !query.value.is_finite() || query.value < 0.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("emission value must be a non-negative number, got {}", query.value)
            })),
        )
            .into_response();
    }

    let average_emission = state
        .lifecycle
        .predictor()
        .and_then(|predictor| predictor.info().mean_emission);

    Json(InsightsResponse {
        value: query.value,
        rating: EmissionRating::from_emission(query.value),
        tips: eco_tips(query.value),
        average_emission,
    })
    .into_response()
}
