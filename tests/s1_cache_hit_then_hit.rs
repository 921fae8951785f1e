mod common;

use common::test_config;
use data_loader::{FetchResponse, LoaderOrchestrator, Params};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn cache_miss_then_hit_serves_the_second_call_without_a_network_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stable/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.fmp.base_url = server.uri();
    let orchestrator = LoaderOrchestrator::new(&config);

    let mut params = Params::new();
    params.insert("symbol".to_string(), json!("AAPL"));

    let first = orchestrator.fetch("fmp", "profile", &params, true).await.unwrap();
    match first {
        FetchResponse::Success { from_cache, data, .. } => {
            assert!(!from_cache);
            assert_eq!(data["symbol"], "AAPL");
        }
        other => panic!("expected success, got {other:?}"),
    }

    // The mock's `.expect(1)` above fails the test on drop if this second
    // fetch reaches the transport instead of the cache.
    let second = orchestrator.fetch("fmp", "profile", &params, true).await.unwrap();
    match second {
        FetchResponse::Success { from_cache, data, .. } => {
            assert!(from_cache);
            assert_eq!(data["symbol"], "AAPL");
        }
        other => panic!("expected success, got {other:?}"),
    }

    let stats = orchestrator.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.api_calls, 1);
    assert_eq!(stats.total_requests, 2);
}
