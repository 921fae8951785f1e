mod common;

use common::test_config;
use data_loader::config::RetrySettings;
use data_loader::{FetchResponse, LoaderOrchestrator, Params};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn retries_transient_server_errors_with_backoff_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable/quote"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stable/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"x": 1}])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fmp.base_url = server.uri();
    config.retry = RetrySettings {
        max_retries: 2,
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(500),
        exponential_base: 2.0,
        jitter: false,
    };
    let orchestrator = LoaderOrchestrator::new(&config);

    let mut params = Params::new();
    params.insert("symbol".to_string(), json!("AAPL"));

    let start = Instant::now();
    let response = orchestrator.fetch("fmp", "quote", &params, false).await.unwrap();
    let elapsed = start.elapsed();

    match response {
        FetchResponse::Success { data, .. } => assert_eq!(data["x"], 1),
        other => panic!("expected success, got {other:?}"),
    }
    // Two backoff sleeps of 50ms and 100ms (2x base, no jitter) precede the
    // third, successful attempt.
    assert!(elapsed >= Duration::from_millis(140), "elapsed was {elapsed:?}");

    let report = orchestrator.api_health_report();
    let fmp = report.health.providers.get("fmp").expect("fmp has a health entry");
    assert_eq!(fmp.successful_requests, 1);
    assert_eq!(fmp.failed_requests, 0);
}
