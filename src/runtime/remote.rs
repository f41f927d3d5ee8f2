//! Predictor that forwards requests to another prediction API over HTTP

use super::{LoadedPredictor, ModelOrigin, Predictor, PredictorFactory};
use crate::error::{PredictError, Result};
use crate::models::FeatureVector;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RemoteReply {
    prediction: f64,
}

pub struct RemotePredictor {
    client: Client,
    endpoint: String,
}

impl RemotePredictor {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Predictor for RemotePredictor {
    async fn predict(&self, features: &FeatureVector) -> std::result::Result<f64, PredictError> {
        debug!("Forwarding prediction to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(features)
            .send()
            .await
            .map_err(|e| PredictError::Remote(e.to_string()))?
            .error_for_status()
            .map_err(|e| PredictError::Remote(e.to_string()))?;

        let reply: RemoteReply = response
            .json()
            .await
            .map_err(|e| PredictError::Remote(format!("malformed reply: {}", e)))?;

        if !reply.prediction.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(reply.prediction)
    }

    fn kind(&self) -> &'static str {
        "remote"
    }
}

pub struct RemoteFactory {
    base_url: String,
    timeout: Duration,
}

impl RemoteFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PredictorFactory for RemoteFactory {
    async fn build(&self) -> Result<LoadedPredictor> {
        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(LoadedPredictor {
            predictor: Arc::new(RemotePredictor::new(client, &self.base_url)),
            quality_score: None,
            origin: ModelOrigin::Remote,
        })
    }
}
