//! Server state management

use super::gate::ConcurrencyGate;
use super::lifecycle::ModelLifecycleManager;
use super::orchestrator::{Outcome, RequestOrchestrator};
use super::result_cache::ResultCache;
use crate::config::ServiceConfig;
use crate::runtime::{factory_from_settings, PredictorFactory};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Exactly-once model initialization and the shared engine
    pub lifecycle: Arc<ModelLifecycleManager>,

    /// Two-tier prediction cache
    pub cache: Arc<ResultCache>,

    /// Bounds concurrent model invocations
    pub gate: Arc<ConcurrencyGate>,

    /// Per-request pipeline
    pub orchestrator: Arc<RequestOrchestrator>,

    /// Service configuration
    pub config: Arc<ServiceConfig>,

    /// Metrics collector
    pub metrics: Arc<Metrics>,
}

/// Metrics collector
#[derive(Default)]
pub struct Metrics {
    /// Total prediction requests processed
    pub total_requests: AtomicU64,

    /// Fresh model predictions
    pub predictions: AtomicU64,

    /// Answered from the exact cache layer
    pub cache_hits: AtomicU64,

    /// Fallback value served (not ready, invalid input, overload, fault)
    pub fallbacks: AtomicU64,

    /// Turned away by the gate
    pub overloads: AtomicU64,

    /// Model errors, timeouts and panics
    pub faults: AtomicU64,

    /// Payloads rejected as malformed
    pub rejected: AtomicU64,

    /// Sum of processing time, microseconds
    pub total_latency_us: AtomicU64,
}

impl Metrics {
    pub fn record(&self, outcome: Outcome, elapsed: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        match outcome {
            Outcome::Predicted => {
                self.predictions.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::CacheHit => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Rejected => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::NotReady | Outcome::Invalid => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Overloaded => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.overloads.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Fault => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.faults.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_latency_us.load(Ordering::Relaxed) as f64 / total as f64 / 1000.0
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "total_requests": self.total_requests.load(Ordering::Relaxed),
            "predictions": self.predictions.load(Ordering::Relaxed),
            "cache_hits": self.cache_hits.load(Ordering::Relaxed),
            "fallbacks": self.fallbacks.load(Ordering::Relaxed),
            "overloads": self.overloads.load(Ordering::Relaxed),
            "faults": self.faults.load(Ordering::Relaxed),
            "rejected": self.rejected.load(Ordering::Relaxed),
            "avg_latency_ms": self.avg_latency_ms(),
        })
    }
}

impl ServerState {
    /// Create a new server state with the predictor named in configuration
    pub fn new(config: ServiceConfig) -> crate::error::Result<Self> {
        let factory = factory_from_settings(&config.model)?;
        Ok(Self::with_factory(config, factory))
    }

    /// Create a new server state around an explicit predictor factory
    pub fn with_factory(config: ServiceConfig, factory: Arc<dyn PredictorFactory>) -> Self {
        let lifecycle = Arc::new(ModelLifecycleManager::new(factory));
        let cache = Arc::new(ResultCache::new(
            config.cache.max_entries,
            config.cache.memo_capacity,
        ));
        let gate = Arc::new(ConcurrencyGate::new(
            config.gate.permits,
            config.gate.max_wait(),
        ));
        let metrics = Arc::new(Metrics::default());
        let orchestrator = Arc::new(RequestOrchestrator::new(
            Arc::clone(&lifecycle),
            Arc::clone(&cache),
            Arc::clone(&gate),
            Arc::clone(&metrics),
            config.model.fallback_value,
            config.init_wait(),
            config.model.predict_timeout(),
        ));

        tracing::info!(
            "Server state ready: cache {} entries, {} prediction slots",
            config.cache.max_entries,
            config.gate.permits
        );

        Self {
            lifecycle,
            cache,
            gate,
            orchestrator,
            config: Arc::new(config),
            metrics,
        }
    }

    /// Health snapshot: readiness, cache sizes, gate load and counters
    pub fn health(&self) -> serde_json::Value {
        let cache = self.cache.stats();
        let gate = self.gate.stats();
        let status = if self.lifecycle.is_ready() { "healthy" } else { "initializing" };
        serde_json::json!({
            "status": status,
            "model_state": self.lifecycle.state(),
            "stats": {
                "cache_size": cache.cache_size,
                "memo_size": cache.memo_size,
                "available_permits": gate.available_permits,
                "model_score": self.lifecycle.quality_score(),
                "model_origin": self.lifecycle.origin(),
                "init_attempts": self.lifecycle.init_attempts(),
                "last_error": self.lifecycle.last_error(),
                "cache": cache,
                "gate": gate,
                "requests": self.metrics.snapshot(),
            },
        })
    }
}
