//! Exactly-once model initialization.
//!
//! The first caller to find the model uninitialized moves it to
//! `Initializing` and runs the factory; concurrent callers see
//! `Initializing` and return at once instead of waiting on training.
//! A failed attempt puts the state back to `NotInitialized` so a later
//! request can retry.

use crate::runtime::{LoadedPredictor, ModelOrigin, Predictor, PredictorFactory};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Externally visible readiness state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    NotInitialized,
    Initializing,
    Ready,
}

/// Answer to [`ModelLifecycleManager::ensure_ready`]
pub enum Readiness {
    Ready(Arc<dyn Predictor>),
    /// Another caller is initializing; try again later
    Initializing,
    /// This attempt failed; the state is retry-eligible again
    Failed(String),
}

struct ReadyModel {
    predictor: Arc<dyn Predictor>,
    quality_score: Option<f64>,
    origin: ModelOrigin,
}

enum Slot {
    NotInitialized,
    Initializing,
    Ready(ReadyModel),
}

pub struct ModelLifecycleManager {
    factory: Arc<dyn PredictorFactory>,
    slot: RwLock<Slot>,
    attempts: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl ModelLifecycleManager {
    pub fn new(factory: Arc<dyn PredictorFactory>) -> Self {
        Self {
            factory,
            slot: RwLock::new(Slot::NotInitialized),
            attempts: AtomicU64::new(0),
            last_error: RwLock::new(None),
        }
    }

    /// Make the model ready if it is not already.
    ///
    /// Returns immediately when ready or when another caller is initializing.
    /// The initialization itself runs on a spawned task, so a caller that
    /// gives up (request timeout, disconnect) never strands the state in
    /// `Initializing`.
    pub async fn ensure_ready(self: &Arc<Self>) -> Readiness {
        {
            let mut slot = self.slot.write();
            if let Slot::Ready(model) = &*slot {
                return Readiness::Ready(Arc::clone(&model.predictor));
            }
            if matches!(*slot, Slot::Initializing) {
                return Readiness::Initializing;
            }
            *slot = Slot::Initializing;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Initializing model (attempt {})", attempt);

        let manager = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = manager.factory.build().await;
            manager.finish(outcome)
        });

        match task.await {
            Ok(readiness) => readiness,
            Err(e) => {
                // The factory panicked; release the slot so a later call can retry
                let message = format!("initialization task aborted: {}", e);
                error!("{}", message);
                *self.slot.write() = Slot::NotInitialized;
                *self.last_error.write() = Some(message.clone());
                Readiness::Failed(message)
            }
        }
    }

    fn finish(&self, outcome: crate::error::Result<LoadedPredictor>) -> Readiness {
        match outcome {
            Ok(loaded) => {
                info!(
                    "Model ready ({} via {:?}, score {:?})",
                    loaded.predictor.kind(),
                    loaded.origin,
                    loaded.quality_score
                );
                let predictor = Arc::clone(&loaded.predictor);
                *self.slot.write() = Slot::Ready(ReadyModel {
                    predictor: loaded.predictor,
                    quality_score: loaded.quality_score,
                    origin: loaded.origin,
                });
                *self.last_error.write() = None;
                Readiness::Ready(predictor)
            }
            Err(e) => {
                error!("Model initialization failed: {}", e);
                *self.slot.write() = Slot::NotInitialized;
                *self.last_error.write() = Some(e.to_string());
                Readiness::Failed(e.to_string())
            }
        }
    }

    /// Kick off initialization without waiting for it
    pub fn spawn_warmup(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            match manager.ensure_ready().await {
                Readiness::Ready(_) => {}
                Readiness::Initializing => {}
                Readiness::Failed(e) => warn!("Warmup failed, will retry on first request: {}", e),
            }
        })
    }

    pub fn state(&self) -> ModelState {
        match &*self.slot.read() {
            Slot::NotInitialized => ModelState::NotInitialized,
            Slot::Initializing => ModelState::Initializing,
            Slot::Ready(_) => ModelState::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// The shared engine, if initialization has completed
    pub fn predictor(&self) -> Option<Arc<dyn Predictor>> {
        match &*self.slot.read() {
            Slot::Ready(model) => Some(Arc::clone(&model.predictor)),
            _ => None,
        }
    }

    /// Quality score recorded at initialization, for diagnostics only
    pub fn quality_score(&self) -> Option<f64> {
        match &*self.slot.read() {
            Slot::Ready(model) => model.quality_score,
            _ => None,
        }
    }

    pub fn origin(&self) -> Option<ModelOrigin> {
        match &*self.slot.read() {
            Slot::Ready(model) => Some(model.origin),
            _ => None,
        }
    }

    pub fn init_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }
}
