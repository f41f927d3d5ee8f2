//! The prediction request pipeline.
//!
//! `handle_predict` validates the payload, consults the result cache, admits
//! the call through the gate and invokes the engine. Every failure becomes a
//! well-formed [`PredictionResponse`] carrying the fallback value and a
//! status discriminator; nothing propagates to the transport.

use super::gate::ConcurrencyGate;
use super::lifecycle::{ModelLifecycleManager, Readiness};
use super::result_cache::ResultCache;
use super::state::Metrics;
use crate::error::PredictError;
use crate::models::FeatureVector;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Response status discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// Genuine model output (fresh or cached)
    Success,
    /// Fallback value served because a prediction could not be computed
    Fallback,
    /// The payload was rejected without any computation
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: f64,
    pub process_time_ms: f64,
    pub status: ResponseStatus,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PredictionResponse {
    pub fn is_client_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

/// Which terminal path a request took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Predicted,
    CacheHit,
    Rejected,
    NotReady,
    Invalid,
    Overloaded,
    Fault,
}

pub struct RequestOrchestrator {
    lifecycle: Arc<ModelLifecycleManager>,
    cache: Arc<ResultCache>,
    gate: Arc<ConcurrencyGate>,
    metrics: Arc<Metrics>,
    fallback_value: f64,
    init_wait: Duration,
    predict_timeout: Duration,
}

impl RequestOrchestrator {
    pub fn new(
        lifecycle: Arc<ModelLifecycleManager>,
        cache: Arc<ResultCache>,
        gate: Arc<ConcurrencyGate>,
        metrics: Arc<Metrics>,
        fallback_value: f64,
        init_wait: Duration,
        predict_timeout: Duration,
    ) -> Self {
        Self {
            lifecycle,
            cache,
            gate,
            metrics,
            fallback_value,
            init_wait,
            predict_timeout,
        }
    }

    pub fn fallback_value(&self) -> f64 {
        self.fallback_value
    }

    /// Handle one prediction request. Never fails.
    pub async fn handle_predict(&self, payload: &Value) -> PredictionResponse {
        let started = Instant::now();
        let (outcome, mut response) = self.run(payload).await;
        let elapsed = started.elapsed();
        response.process_time_ms = elapsed.as_secs_f64() * 1000.0;
        self.metrics.record(outcome, elapsed);
        debug!(
            "Prediction {:?}: {:.2} in {:.2}ms",
            outcome, response.prediction, response.process_time_ms
        );
        response
    }

    async fn run(&self, payload: &Value) -> (Outcome, PredictionResponse) {
        let Some(object) = payload.as_object() else {
            return (Outcome::Rejected, self.rejected("payload must be a JSON object"));
        };

        // Initialization continues on its own task if this wait elapses
        let predictor = match self.lifecycle.predictor() {
            Some(predictor) => predictor,
            None => match tokio::time::timeout(self.init_wait, self.lifecycle.ensure_ready()).await {
                Ok(Readiness::Ready(predictor)) => predictor,
                Ok(Readiness::Initializing) | Err(_) => {
                    return (Outcome::NotReady, self.fallback("model is initializing"));
                }
                Ok(Readiness::Failed(e)) => {
                    warn!("Serving fallback, model unavailable: {}", e);
                    return (Outcome::NotReady, self.fallback(format!("model unavailable: {}", e)));
                }
            },
        };

        let features = match FeatureVector::from_object(object) {
            Ok(features) => features,
            Err(e) => return (Outcome::Invalid, self.fallback(e.to_string())),
        };

        let key = features.cache_key();
        if let Some(value) = self.cache.get_key(&key) {
            return (Outcome::CacheHit, self.success(value, true));
        }

        let token = match self.gate.try_acquire().await {
            Ok(token) => token,
            Err(e) => return (Outcome::Overloaded, self.fallback(format!("server overloaded: {}", e))),
        };

        let invocation = tokio::time::timeout(
            self.predict_timeout,
            self.cache.memoized(&features, || predictor.predict(&features)),
        );
        let result = AssertUnwindSafe(invocation).catch_unwind().await;
        token.release();

        let value = match result {
            Ok(Ok(Ok((value, _)))) => value,
            Ok(Ok(Err(e))) => return (Outcome::Fault, self.fault(e)),
            Ok(Err(_)) => {
                let e = PredictError::Timeout(self.predict_timeout.as_millis() as u64);
                return (Outcome::Fault, self.fault(e));
            }
            Err(_) => return (Outcome::Fault, self.fallback("prediction panicked")),
        };

        self.cache.put_key(key, value);
        (Outcome::Predicted, self.success(value, false))
    }

    fn success(&self, prediction: f64, cached: bool) -> PredictionResponse {
        PredictionResponse {
            prediction,
            process_time_ms: 0.0,
            status: ResponseStatus::Success,
            cached,
            message: None,
        }
    }

    fn fallback(&self, message: impl Into<String>) -> PredictionResponse {
        PredictionResponse {
            prediction: self.fallback_value,
            process_time_ms: 0.0,
            status: ResponseStatus::Fallback,
            cached: false,
            message: Some(message.into()),
        }
    }

    fn fault(&self, error: PredictError) -> PredictionResponse {
        warn!("Prediction failed, serving fallback: {}", error);
        self.fallback(error.to_string())
    }

    fn rejected(&self, message: &str) -> PredictionResponse {
        PredictionResponse {
            status: ResponseStatus::Error,
            ..self.fallback(message)
        }
    }
}
