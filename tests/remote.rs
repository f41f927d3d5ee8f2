mod common;

use co2stream_core::{
    config::PredictorKind,
    models::FeatureVector,
    runtime::{factory_from_settings, ModelOrigin, Predictor, PredictorFactory, RemoteFactory},
    server::ResponseStatus,
    ServerState,
};
use common::{sample_payload, start_test_server, stub_state, test_config, Behavior};
use std::time::Duration;

#[tokio::test]
async fn test_remote_predictor_forwards_to_upstream() {
    let (upstream, _, _) = stub_state(Behavior::Sum, Duration::ZERO);
    let server = start_test_server(upstream.clone()).await;

    let loaded = RemoteFactory::new(format!("{}/", server.url()), Duration::from_secs(2))
        .build()
        .await
        .unwrap();
    assert_eq!(loaded.origin, ModelOrigin::Remote);
    assert_eq!(loaded.predictor.kind(), "remote");

    let features = FeatureVector::from_payload(&sample_payload()).unwrap();
    let remote = loaded.predictor.predict(&features).await.unwrap();
    let local = upstream.orchestrator.handle_predict(&sample_payload()).await;
    assert_eq!(remote, local.prediction);

    server.handle.abort();
}

#[tokio::test]
async fn test_remote_service_end_to_end() {
    let (upstream, predictor, _) = stub_state(Behavior::Sum, Duration::ZERO);
    let server = start_test_server(upstream).await;

    let mut config = test_config();
    config.model.predictor = PredictorKind::Remote;
    config.model.remote_url = Some(server.url());
    let state = ServerState::new(config).unwrap();

    let first = state.orchestrator.handle_predict(&sample_payload()).await;
    let second = state.orchestrator.handle_predict(&sample_payload()).await;
    assert_eq!(first.status, ResponseStatus::Success);
    assert!(second.cached);
    assert_eq!(predictor.calls(), 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_unreachable_remote_serves_fallback() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = test_config();
    config.model.predictor = PredictorKind::Remote;
    config.model.remote_url = Some(format!("http://{}", addr));
    let state = ServerState::new(config).unwrap();

    let response = state.orchestrator.handle_predict(&sample_payload()).await;
    assert_eq!(response.status, ResponseStatus::Fallback);
    assert_eq!(response.prediction, 200.0);
    assert!(response.message.unwrap().contains("Remote prediction failed"));
    assert_eq!(state.gate.outstanding(), 0);
}

#[test]
fn test_remote_requires_url() {
    let mut config = test_config();
    config.model.predictor = PredictorKind::Remote;
    config.model.remote_url = None;
    assert!(factory_from_settings(&config.model).is_err());
}
