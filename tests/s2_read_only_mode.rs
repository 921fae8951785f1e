mod common;

use common::test_config;
use data_loader::{FetchResponse, LoaderOrchestrator, OperatingMode, OrchestratorError, Params};
use serde_json::json;

#[tokio::test]
async fn read_only_mode_rejects_an_uncached_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.operating_mode = OperatingMode::ReadOnly;
    let orchestrator = LoaderOrchestrator::new(&config);

    let mut params = Params::new();
    params.insert("symbol".to_string(), json!("NVDA"));

    let err = orchestrator.fetch("fmp", "profile", &params, true).await.unwrap_err();
    match err {
        OrchestratorError::ReadOnly { provider, endpoint } => {
            assert_eq!(provider, "fmp");
            assert_eq!(endpoint, "profile");
        }
        other => panic!("expected ReadOnly, got {other:?}"),
    }
}

#[tokio::test]
async fn read_only_mode_still_serves_an_entry_cached_while_live() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let orchestrator = LoaderOrchestrator::new(&config);

    let cache_key = loader_providers::derive_cache_key("profile", &{
        let mut p = Params::new();
        p.insert("symbol".to_string(), json!("AAPL"));
        p
    });
    let cache = loader_cache::CacheStore::new(config.cache.base_dir.clone(), config.cache.ttl_days);
    cache
        .set("fmp", &cache_key, json!({"symbol": "AAPL", "companyName": "Apple Inc."}), None)
        .unwrap();

    orchestrator.set_operating_mode(OperatingMode::ReadOnly);

    let mut params = Params::new();
    params.insert("symbol".to_string(), json!("AAPL"));
    let response = orchestrator.fetch("fmp", "profile", &params, true).await.unwrap();
    match response {
        FetchResponse::Success { from_cache, data, .. } => {
            assert!(from_cache);
            assert_eq!(data["symbol"], "AAPL");
        }
        other => panic!("expected success, got {other:?}"),
    }
}
