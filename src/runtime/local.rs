//! In-process predictor backed by the trained linear regressor

use super::{LoadedPredictor, ModelInfo, ModelOrigin, Predictor, PredictorFactory};
use crate::config::ModelSettings;
use crate::error::{Error, PredictError, Result};
use crate::models::{storage::ArtifactStore, Dataset, FeatureVector, LinearRegressor};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct LocalPredictor {
    model: LinearRegressor,
    mean_emission: Option<f64>,
}

impl LocalPredictor {
    pub fn new(model: LinearRegressor, mean_emission: Option<f64>) -> Self {
        Self { model, mean_emission }
    }
}

#[async_trait]
impl Predictor for LocalPredictor {
    async fn predict(&self, features: &FeatureVector) -> std::result::Result<f64, PredictError> {
        let value = self.model.predict(&features.to_array());
        if !value.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(value)
    }

    fn kind(&self) -> &'static str {
        "local"
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            kind: self.kind(),
            quality_score: Some(self.model.score()),
            mean_emission: self.mean_emission,
            feature_importance: self.model.feature_importance(),
        }
    }
}

/// Loads the persisted artifact, or trains from the dataset and persists the result
#[derive(Clone)]
pub struct LocalTrainer {
    dataset_path: PathBuf,
    store: Arc<ArtifactStore>,
    test_fraction: f64,
    ridge: f64,
}

impl LocalTrainer {
    pub fn new(dataset_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            store: Arc::new(ArtifactStore::new(artifact_dir)),
            test_fraction: 0.2,
            ridge: 1e-6,
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self {
            dataset_path: settings.dataset_path.clone(),
            store: Arc::new(ArtifactStore::new(settings.artifact_dir.clone())),
            test_fraction: settings.test_fraction,
            ridge: settings.ridge,
        }
    }

    /// Blocking body of [`PredictorFactory::build`]
    pub fn load_or_train(&self) -> Result<LoadedPredictor> {
        if let Some(model) = self.store.load()? {
            // The dataset only feeds diagnostics here, so a missing file is not fatal
            let mean_emission = match Dataset::load(&self.dataset_path) {
                Ok(dataset) => dataset.mean_target(),
                Err(e) => {
                    warn!("Artifact loaded but dataset unavailable for diagnostics: {}", e);
                    None
                }
            };
            let score = model.score();
            return Ok(LoadedPredictor {
                predictor: Arc::new(LocalPredictor::new(model, mean_emission)),
                quality_score: Some(score),
                origin: ModelOrigin::Artifact,
            });
        }

        info!("No trained model found, training from {:?}", self.dataset_path);
        let dataset = Dataset::load(&self.dataset_path)?;
        let (model, report) = LinearRegressor::train(&dataset, self.test_fraction, self.ridge)?;
        info!(
            "Trained on {} rows, held-out R² {:.3} over {} rows",
            report.train_rows, report.score, report.test_rows
        );

        if let Err(e) = self.store.save(&model) {
            warn!("Failed to persist model artifact: {}", e);
        }

        Ok(LoadedPredictor {
            predictor: Arc::new(LocalPredictor::new(model, report.mean_emission)),
            quality_score: Some(report.score),
            origin: ModelOrigin::Trained,
        })
    }
}

#[async_trait]
impl PredictorFactory for LocalTrainer {
    async fn build(&self) -> Result<LoadedPredictor> {
        let trainer = self.clone();
        // Training is CPU bound; keep it off the async workers
        tokio::task::spawn_blocking(move || trainer.load_or_train())
            .await
            .map_err(|e| Error::Internal(format!("training task failed: {}", e)))?
    }
}
