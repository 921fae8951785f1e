use data_loader::config::{
    CacheConfig, CircuitBreakerSettings, Config, LogLevel, LoggingSettings, ProviderConfig, RetrySettings,
};
use data_loader::OperatingMode;
use std::path::Path;
use std::time::Duration;

/// A `Config` suitable for tests: every provider's `base_url` points
/// nowhere in particular until the caller overrides it with a
/// `wiremock::MockServer`'s URI, and the cache lives under a caller-owned
/// temp directory.
pub fn test_config(cache_dir: &Path) -> Config {
    Config {
        fmp: ProviderConfig {
            api_key: Some("test-fmp-key".to_string()),
            base_url: "http://127.0.0.1:0".to_string(),
            max_concurrency: 3,
            timeout: Duration::from_secs(5),
        },
        polygon: ProviderConfig {
            api_key: Some("test-polygon-key".to_string()),
            base_url: "http://127.0.0.1:0".to_string(),
            max_concurrency: 10,
            timeout: Duration::from_secs(5),
        },
        fred: ProviderConfig {
            api_key: Some("test-fred-key".to_string()),
            base_url: "http://127.0.0.1:0".to_string(),
            max_concurrency: 1,
            timeout: Duration::from_secs(5),
        },
        cache: CacheConfig {
            base_dir: cache_dir.to_path_buf(),
            ttl_days: 7,
            enabled: true,
        },
        circuit_breaker: CircuitBreakerSettings::default(),
        retry: RetrySettings {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            exponential_base: 2.0,
            jitter: true,
        },
        operating_mode: OperatingMode::Live,
        log_level: LogLevel::Info,
        logging: LoggingSettings::default(),
        project_root: cache_dir.to_path_buf(),
    }
}
