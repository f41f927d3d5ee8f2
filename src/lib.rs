//! co2stream: serving vehicle CO2 emission predictions.
//!
//! The serving core lives in [`server`]: exactly-once model initialization,
//! a two-tier result cache, a bounded-wait concurrency gate and the request
//! orchestrator that turns every failure into a fallback response.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod runtime;
pub mod server;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use error::{Error, PredictError, Result};
pub use models::{CacheKey, FeatureVector};
pub use runtime::{LocalPredictor, Predictor, PredictorFactory, RemotePredictor};
pub use server::{PredictionResponse, ResponseStatus, ServerState};
