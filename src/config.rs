//! Configuration management for the co2stream service.
//!
//! Configuration is read from multiple sources, later ones overriding
//! earlier ones:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/co2stream/config.toml`)
//! 3. User-specified configuration file
//! 4. Environment variables (prefixed with `CO2STREAM_`, nested keys joined by `__`)
//! 5. Command-line arguments
//!
//! # Environment Variables
//!
//! - `CO2STREAM_MODEL__DATASET_PATH` - Training dataset location
//! - `CO2STREAM_MODEL__PREDICTOR` - `local` or `remote`
//! - `CO2STREAM_MODEL__REMOTE_URL` - Base URL of the remote prediction API
//! - `CO2STREAM_GATE__PERMITS` - Concurrent prediction slots

use crate::constants::ENV_PREFIX;
use crate::error::{Error, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line overrides shared by every subcommand that builds a service.
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, env = "CO2STREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Training dataset (CSV)
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Directory holding persisted model artifacts
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Predictor variant (local, remote)
    #[arg(long)]
    pub predictor: Option<PredictorKind>,

    /// Base URL of the remote prediction API
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Concurrent prediction slots
    #[arg(long)]
    pub permits: Option<usize>,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub cache: CacheSettings,
    pub gate: GateSettings,
}

/// Network and process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write logs to a file in this directory in addition to stderr
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Begin model initialization in the background at startup
    #[serde(default = "default_true")]
    pub warmup: bool,
}

/// Which predictor variant backs the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PredictorKind {
    Local,
    Remote,
}

/// Model lifecycle and invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub dataset_path: PathBuf,
    pub artifact_dir: PathBuf,
    #[serde(default = "default_predictor")]
    pub predictor: PredictorKind,
    #[serde(default)]
    pub remote_url: Option<String>,
    /// How long the request that starts initialization waits for it before
    /// answering with the fallback. Capped below the request timeout.
    #[serde(default = "default_init_wait_ms")]
    pub init_wait_ms: u64,
    /// Hard upper bound on a single model invocation
    #[serde(default = "default_predict_timeout_ms")]
    pub predict_timeout_ms: u64,
    /// Value served on every fallback path
    #[serde(default = "default_fallback_value")]
    pub fallback_value: f64,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_ridge")]
    pub ridge: f64,
}

/// Result cache bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Exact-feature layer; inserts are dropped once full
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Memoized scalar layer; least recently used entries are evicted
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: usize,
}

/// Admission control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSettings {
    #[serde(default = "default_permits")]
    pub permits: usize,
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

impl ServiceConfig {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name("/etc/co2stream/config.toml").required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let mut config: ServiceConfig = builder.build()?.try_deserialize()?;
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Override loaded values with command line args
    pub fn apply_args(&mut self, args: &ConfigArgs) {
        if let Some(dataset) = &args.dataset {
            self.model.dataset_path = dataset.clone();
        }
        if let Some(dir) = &args.artifact_dir {
            self.model.artifact_dir = dir.clone();
        }
        if let Some(kind) = args.predictor {
            self.model.predictor = kind;
        }
        if let Some(url) = &args.remote_url {
            self.model.remote_url = Some(url.clone());
        }
        if let Some(permits) = args.permits {
            self.gate.permits = permits;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gate.permits == 0 {
            return Err(Error::Config("gate.permits must be at least 1".into()));
        }
        if self.cache.max_entries == 0 || self.cache.memo_capacity == 0 {
            return Err(Error::Config("cache capacities must be at least 1".into()));
        }
        if !(self.model.test_fraction > 0.0 && self.model.test_fraction < 1.0) {
            return Err(Error::Config(format!(
                "model.test_fraction must lie in (0, 1), got {}",
                self.model.test_fraction
            )));
        }
        if !self.model.fallback_value.is_finite() {
            return Err(Error::Config("model.fallback_value must be finite".into()));
        }
        if self.model.predictor == PredictorKind::Remote && self.model.remote_url.is_none() {
            return Err(Error::Config("remote predictor requires model.remote_url".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Initialization wait for the triggering request, kept under half the
    /// request timeout so the transport never cuts the response off
    pub fn init_wait(&self) -> Duration {
        Duration::from_millis(self.model.init_wait_ms).min(self.server.request_timeout() / 2)
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GateSettings {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl ModelSettings {
    pub fn predict_timeout(&self) -> Duration {
        Duration::from_millis(self.predict_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout_secs(),
                log_level: default_log_level(),
                log_dir: None,
                warmup: true,
            },
            model: ModelSettings {
                dataset_path: PathBuf::from("co2 Emissions.csv"),
                artifact_dir: PathBuf::from("models"),
                predictor: default_predictor(),
                remote_url: None,
                init_wait_ms: default_init_wait_ms(),
                predict_timeout_ms: default_predict_timeout_ms(),
                fallback_value: default_fallback_value(),
                test_fraction: default_test_fraction(),
                ridge: default_ridge(),
            },
            cache: CacheSettings {
                max_entries: default_max_entries(),
                memo_capacity: default_memo_capacity(),
            },
            gate: GateSettings {
                permits: default_permits(),
                max_wait_ms: default_max_wait_ms(),
            },
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_predictor() -> PredictorKind {
    PredictorKind::Local
}

fn default_init_wait_ms() -> u64 {
    10_000
}

fn default_predict_timeout_ms() -> u64 {
    2000
}

fn default_fallback_value() -> f64 {
    crate::constants::DEFAULT_FALLBACK_PREDICTION
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_ridge() -> f64 {
    1e-6
}

fn default_max_entries() -> usize {
    500
}

fn default_memo_capacity() -> usize {
    2048
}

fn default_permits() -> usize {
    10
}

fn default_max_wait_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServiceConfig::load(&ConfigArgs::default()).unwrap();
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.gate.permits, 10);
        assert_eq!(config.gate.max_wait(), Duration::from_millis(500));
        assert_eq!(config.model.fallback_value, 200.0);
        assert_eq!(config.model.predictor, PredictorKind::Local);
    }

    #[test]
    fn test_args_override() {
        let args = ConfigArgs {
            dataset: Some(PathBuf::from("/data/cars.csv")),
            permits: Some(3),
            ..Default::default()
        };
        let config = ServiceConfig::load(&args).unwrap();
        assert_eq!(config.model.dataset_path, PathBuf::from("/data/cars.csv"));
        assert_eq!(config.gate.permits, 3);
    }

    #[test]
    fn test_validation_rejects_zero_permits() {
        let mut config = ServiceConfig::default();
        config.gate.permits = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_init_wait_stays_under_request_timeout() {
        let mut config = ServiceConfig::default();
        config.model.init_wait_ms = 60_000;
        config.server.request_timeout_secs = 4;
        assert_eq!(config.init_wait(), Duration::from_secs(2));

        config.model.init_wait_ms = 300;
        assert_eq!(config.init_wait(), Duration::from_millis(300));
    }

    #[test]
    fn test_remote_without_url_fails_to_load() {
        let args = ConfigArgs {
            predictor: Some(PredictorKind::Remote),
            ..Default::default()
        };
        assert!(matches!(ServiceConfig::load(&args), Err(Error::Config(_))));

        let args = ConfigArgs {
            predictor: Some(PredictorKind::Remote),
            remote_url: Some("http://localhost:10000".into()),
            ..Default::default()
        };
        assert!(ServiceConfig::load(&args).is_ok());
    }

    #[test]
    fn test_remote_requires_url() {
        let mut config = ServiceConfig::default();
        config.model.predictor = PredictorKind::Remote;
        assert!(config.validate().is_err());
        config.model.remote_url = Some("http://localhost:10000".into());
        assert!(config.validate().is_ok());
    }
}
