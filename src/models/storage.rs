//! Persisted model artifacts.
//!
//! A trained regressor is stored as two bincode files under the artifact
//! directory: the weights and the feature scaler. Both must be present for
//! a load to succeed.

use super::regression::{LinearRegressor, Scaler, Weights};
use crate::constants::artifacts::{MODEL_FILE, SCALER_FILE};
use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn exists(&self) -> bool {
        self.model_path().exists() && self.scaler_path().exists()
    }

    /// Load a previously saved regressor; `Ok(None)` when no artifact is present
    pub fn load(&self) -> Result<Option<LinearRegressor>> {
        if !self.exists() {
            debug!("No model artifact under {:?}", self.dir);
            return Ok(None);
        }
        let weights: Weights = read(&self.model_path())?;
        let scaler: Scaler = read(&self.scaler_path())?;
        info!("Loaded model artifact from {:?} (score {:.3})", self.dir, weights.score);
        Ok(Some(LinearRegressor::from_parts(scaler, weights)))
    }

    pub fn save(&self, model: &LinearRegressor) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        write(&self.scaler_path(), model.scaler())?;
        write(&self.model_path(), model.weights())?;
        info!("Saved model artifact to {:?}", self.dir);
        Ok(())
    }
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

// Write to a sibling temp file and rename so readers never see a partial file
fn write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
