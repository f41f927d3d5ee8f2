mod common;

use co2stream_core::{
    runtime::LocalTrainer,
    server::{ModelState, ResponseStatus},
    ServerState,
};
use common::{
    payload_with_horsepower, sample_payload, stub_state_with, test_config, write_dataset,
    Behavior, StubFactory, StubPredictor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_initialize_once() {
    let predictor = StubPredictor::new(Behavior::Sum, Duration::ZERO);
    let factory = StubFactory::with(predictor, Duration::from_millis(300), 0);
    let state = ServerState::with_factory(test_config(), factory.clone());

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move { state.orchestrator.handle_predict(&sample_payload()).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        match response.status {
            ResponseStatus::Success => successes += 1,
            // Callers that arrive during initialization get the fallback at once
            ResponseStatus::Fallback => {
                assert_eq!(response.prediction, 200.0);
                assert!(response.process_time_ms < 250.0);
            }
            ResponseStatus::Error => panic!("valid payload rejected"),
        }
    }

    assert_eq!(factory.builds(), 1);
    assert!(successes >= 1);
    assert_eq!(state.lifecycle.state(), ModelState::Ready);
    assert_eq!(state.lifecycle.init_attempts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_train_once() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path(), 200);
    let artifacts = dir.path().join("models");
    let trainer = Arc::new(LocalTrainer::new(&dataset, &artifacts));
    let state = ServerState::with_factory(test_config(), trainer);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move { state.lifecycle.ensure_ready().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(state.lifecycle.is_ready());
    assert_eq!(state.lifecycle.init_attempts(), 1);
    assert!(artifacts.join("trained_model.bin").exists());
    assert!(artifacts.join("trained_scaler.bin").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_burst_against_slow_model_is_bounded() {
    let mut config = test_config();
    config.gate.permits = 4;
    config.gate.max_wait_ms = 100;
    config.model.predict_timeout_ms = 2000;
    let (state, predictor, _) = stub_state_with(config, Behavior::Sum, Duration::from_millis(400));
    state.lifecycle.ensure_ready().await;

    let started = Instant::now();
    let handles: Vec<_> = (0..100)
        .map(|i| {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .orchestrator
                    .handle_predict(&payload_with_horsepower(i as f64))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut overloads = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.prediction.is_finite());
        match response.status {
            ResponseStatus::Success => successes += 1,
            ResponseStatus::Fallback => {
                assert!(response.message.unwrap().contains("overloaded"));
                overloads += 1;
            }
            ResponseStatus::Error => panic!("valid payload rejected"),
        }
    }
    let elapsed = started.elapsed();

    assert!(predictor.peak() <= 4, "peak concurrency {}", predictor.peak());
    assert!(successes >= 4);
    assert!(overloads > 0);
    assert_eq!(successes + overloads, 100);
    // One slow call plus the bounded wait, not 100 queued calls
    assert!(elapsed < Duration::from_secs(3), "burst took {:?}", elapsed);
    assert_eq!(state.gate.outstanding(), 0);
    assert_eq!(state.metrics.snapshot()["overloads"], overloads);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tokens_return_after_faults() {
    for behavior in [Behavior::Sum, Behavior::Fail, Behavior::Panic] {
        let (state, _, _) = stub_state_with(test_config(), behavior, Duration::from_millis(5));
        let before = state.gate.outstanding();

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .orchestrator
                        .handle_predict(&payload_with_horsepower(i as f64))
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().prediction.is_finite());
        }

        assert_eq!(state.gate.outstanding(), before);
        assert_eq!(state.gate.available_permits(), 4);
    }
}
