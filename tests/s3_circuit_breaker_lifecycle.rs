mod common;

use common::test_config;
use data_loader::config::RetrySettings;
use data_loader::{LoaderOrchestrator, OrchestratorError, Params};
use loader_circuitbreaker::CircuitState;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn breaker_opens_after_min_requests_then_half_opens_past_recovery_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable/quote"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fmp.base_url = server.uri();
    config.circuit_breaker.error_threshold = 0.5;
    config.circuit_breaker.min_requests = 3;
    config.circuit_breaker.recovery_timeout = Duration::from_millis(50);
    config.retry = RetrySettings {
        max_retries: 0,
        ..RetrySettings::default()
    };
    let orchestrator = LoaderOrchestrator::new(&config);

    let mut params = Params::new();
    params.insert("symbol".to_string(), json!("AAPL"));

    for _ in 0..3 {
        let response = orchestrator.fetch("fmp", "quote", &params, false).await.unwrap();
        assert!(!response.is_success());
    }

    let err = orchestrator.fetch("fmp", "quote", &params, false).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::CircuitOpen { state: CircuitState::Open, .. }
    ));

    tokio::time::sleep(Duration::from_millis(75)).await;

    // The breaker lets this attempt through (Half-Open) rather than
    // rejecting it outright, even though the transport still fails it.
    let response = orchestrator.fetch("fmp", "quote", &params, false).await;
    assert!(response.is_ok());
}
