mod common;

use common::test_config;
use data_loader::config::RetrySettings;
use data_loader::{LoaderOrchestrator, OrchestratorError, Params};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn one_providers_open_breaker_does_not_affect_another() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable/quote"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/aggs/ticker/.*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "results": []})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fmp.base_url = server.uri();
    config.polygon.base_url = server.uri();
    config.circuit_breaker.error_threshold = 0.5;
    config.circuit_breaker.min_requests = 1;
    config.circuit_breaker.recovery_timeout = Duration::from_secs(60);
    config.retry = RetrySettings {
        max_retries: 0,
        ..RetrySettings::default()
    };
    let orchestrator = LoaderOrchestrator::new(&config);

    let mut fmp_params = Params::new();
    fmp_params.insert("symbol".to_string(), json!("AAPL"));
    let failed = orchestrator.fetch("fmp", "quote", &fmp_params, false).await.unwrap();
    assert!(!failed.is_success());

    let err = orchestrator.fetch("fmp", "quote", &fmp_params, false).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::CircuitOpen { .. }));

    let mut polygon_params = Params::new();
    polygon_params.insert("symbol".to_string(), json!("AAPL"));
    polygon_params.insert("start".to_string(), json!("2024-01-01"));
    polygon_params.insert("end".to_string(), json!("2024-01-31"));
    let response = orchestrator
        .fetch("polygon", "aggs_daily", &polygon_params, false)
        .await
        .unwrap();
    assert!(response.is_success());
}
