//! Prediction backends.
//!
//! [`Predictor`] is the engine the serving layer calls per request. A
//! [`PredictorFactory`] produces one during model initialization; which
//! variant is used is fixed at construction from configuration.

use crate::config::{ModelSettings, PredictorKind};
use crate::error::{Error, PredictError, Result};
use crate::models::FeatureVector;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

pub mod local;
pub mod remote;

pub use local::{LocalPredictor, LocalTrainer};
pub use remote::{RemoteFactory, RemotePredictor};

/// A ready-to-use regression engine. Shared read-only across requests.
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Predict CO2 emissions in g/km
    async fn predict(&self, features: &FeatureVector) -> std::result::Result<f64, PredictError>;

    /// Short backend name for diagnostics
    fn kind(&self) -> &'static str;

    /// Diagnostic details about the loaded model
    fn info(&self) -> ModelInfo {
        ModelInfo {
            kind: self.kind(),
            ..Default::default()
        }
    }
}

/// Where an initialized predictor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelOrigin {
    /// Loaded from a persisted artifact, training skipped
    Artifact,
    /// Trained from the dataset during this initialization
    Trained,
    /// Backed by a remote prediction API
    Remote,
}

/// Outcome of a successful initialization
pub struct LoadedPredictor {
    pub predictor: Arc<dyn Predictor>,
    pub quality_score: Option<f64>,
    pub origin: ModelOrigin,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelInfo {
    pub kind: &'static str,
    pub quality_score: Option<f64>,
    pub mean_emission: Option<f64>,
    pub feature_importance: Vec<(&'static str, f64)>,
}

/// One-shot builder of a [`Predictor`], run under the lifecycle manager's guard
#[async_trait]
pub trait PredictorFactory: Send + Sync {
    async fn build(&self) -> Result<LoadedPredictor>;
}

/// Pick the predictor variant named in configuration
pub fn factory_from_settings(settings: &ModelSettings) -> Result<Arc<dyn PredictorFactory>> {
    match settings.predictor {
        PredictorKind::Local => Ok(Arc::new(LocalTrainer::from_settings(settings))),
        PredictorKind::Remote => {
            let url = settings
                .remote_url
                .clone()
                .ok_or_else(|| Error::Config("remote predictor requires model.remote_url".into()))?;
            Ok(Arc::new(RemoteFactory::new(url, settings.predict_timeout())))
        }
    }
}
