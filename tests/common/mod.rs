//! Shared helpers for co2stream integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use co2stream_core::{
    config::ServiceConfig,
    error::{Error, PredictError, Result},
    models::FeatureVector,
    runtime::{LoadedPredictor, ModelOrigin, Predictor, PredictorFactory},
    server::{create_app, ServerState},
};
use serde_json::{json, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// CO2 for the synthetic fleet; every feature contributes
pub fn emission_formula(row: &[f64; 6]) -> f64 {
    12.0 * row[0] + 4.0 * row[1] + 14.0 * row[2] + 0.08 * row[3] + 0.01 * row[4] - 0.5 * (row[5] - 2015.0)
}

/// Write a CSV in the public dataset's layout (extra text columns included)
pub fn write_dataset(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("co2 Emissions.csv");
    let mut file = std::fs::File::create(&path).expect("create dataset");
    writeln!(
        file,
        "Make,Model,Engine Size(L),Cylinders,Fuel Consumption Comb (L/100 km),Horsepower,Weight (kg),Year,CO2 Emissions(g/km)"
    )
    .unwrap();
    for i in 0..rows {
        let row = [
            1.0 + (i % 7) as f64 * 0.5,
            [3.0, 4.0, 6.0, 8.0][i % 4],
            5.0 + (i % 11) as f64 * 0.7,
            90.0 + (i * 37 % 250) as f64,
            1100.0 + (i * 53 % 900) as f64,
            2010.0 + (i % 14) as f64,
        ];
        writeln!(
            file,
            "Make{},Model{},{},{},{},{},{},{},{}",
            i % 5,
            i,
            row[0],
            row[1],
            row[2],
            row[3],
            row[4],
            row[5],
            emission_formula(&row)
        )
        .unwrap();
    }
    path
}

/// The reference vehicle used throughout the tests
pub fn sample_payload() -> Value {
    json!({
        "Engine Size(L)": 2.0,
        "Cylinders": 4,
        "Fuel Consumption Comb (L/100 km)": 8.0,
        "Horsepower": 200,
        "Weight (kg)": 1500,
        "Year": 2023
    })
}

/// Sample payload with a different horsepower, for distinct cache keys
pub fn payload_with_horsepower(horsepower: f64) -> Value {
    let mut payload = sample_payload();
    payload["Horsepower"] = json!(horsepower);
    payload
}

/// Configuration suitable for tests: no warmup, small bounds
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.server.warmup = false;
    config.model.predict_timeout_ms = 1000;
    config.gate.permits = 4;
    config.gate.max_wait_ms = 200;
    config
}

/// How the stub predictor behaves per call
#[derive(Clone, Copy)]
pub enum Behavior {
    /// Sum of the features, after `delay`
    Sum,
    /// Always fail
    Fail,
    /// Panic inside predict
    Panic,
}

pub struct StubPredictor {
    pub behavior: Behavior,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl StubPredictor {
    pub fn new(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Predictor for StubPredictor {
    async fn predict(&self, features: &FeatureVector) -> std::result::Result<f64, PredictError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Sum => Ok(features.to_array().iter().sum::<f64>() / 20.0),
            Behavior::Fail => Err(PredictError::Remote("model backend exploded".into())),
            Behavior::Panic => panic!("regressor state corrupted"),
        }
    }

    fn kind(&self) -> &'static str {
        "stub"
    }
}

/// Factory handing out one shared stub; optionally slow or failing
pub struct StubFactory {
    pub predictor: Arc<StubPredictor>,
    pub build_delay: Duration,
    pub failures: usize,
    pub builds: AtomicUsize,
}

impl StubFactory {
    pub fn new(predictor: Arc<StubPredictor>) -> Arc<Self> {
        Self::with(predictor, Duration::ZERO, 0)
    }

    pub fn with(predictor: Arc<StubPredictor>, build_delay: Duration, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            predictor,
            build_delay,
            failures,
            builds: AtomicUsize::new(0),
        })
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictorFactory for StubFactory {
    async fn build(&self) -> Result<LoadedPredictor> {
        let n = self.builds.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            tokio::time::sleep(self.build_delay).await;
        }
        if n < self.failures {
            return Err(Error::Dataset("dataset unreadable".into()));
        }
        Ok(LoadedPredictor {
            predictor: self.predictor.clone(),
            quality_score: Some(0.95),
            origin: ModelOrigin::Trained,
        })
    }
}

/// State around a stub predictor with the test configuration
pub fn stub_state(behavior: Behavior, delay: Duration) -> (ServerState, Arc<StubPredictor>, Arc<StubFactory>) {
    stub_state_with(test_config(), behavior, delay)
}

pub fn stub_state_with(
    config: ServiceConfig,
    behavior: Behavior,
    delay: Duration,
) -> (ServerState, Arc<StubPredictor>, Arc<StubFactory>) {
    let predictor = StubPredictor::new(behavior, delay);
    let factory = StubFactory::new(predictor.clone());
    let state = ServerState::with_factory(config, factory.clone());
    (state, predictor, factory)
}

pub struct TestServer {
    pub handle: tokio::task::JoinHandle<()>,
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Serve `state` on an ephemeral local port
pub async fn start_test_server(state: ServerState) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = create_app(state);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("Test server failed: {}", e);
        }
    });

    TestServer { handle, addr }
}
