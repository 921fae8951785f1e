//! Configuration (§10.3): environment-driven, accumulating rather than
//! fail-fast on validation problems.

use loader_core::OperatingMode;
use std::path::PathBuf;
use std::time::Duration;

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com";
pub const POLYGON_BASE_URL: &str = "https://api.polygon.io";
pub const FRED_BASE_URL: &str = "https://api.stlouisfed.org/fred";

pub const FMP_MAX_CONCURRENCY: usize = 3;
pub const POLYGON_MAX_CONCURRENCY: usize = 10;
pub const FRED_MAX_CONCURRENCY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn from_env_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "WARNING" | "WARN" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            // Anything unrecognized falls back to INFO rather than failing
            // the whole config load over a typo'd env var.
            _ => LogLevel::Info,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Error | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

/// Per-provider connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_concurrency: usize,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub base_dir: PathBuf,
    pub ttl_days: u32,
    pub enabled: bool,
}

impl CacheConfig {
    pub fn provider_dir(&self, provider: &str) -> PathBuf {
        self.base_dir.join(format!("{provider}_cache"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerSettings {
    pub error_threshold: f64,
    pub recovery_timeout: Duration,
    pub min_requests: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            error_threshold: 0.20,
            recovery_timeout: Duration::from_secs(60),
            min_requests: 10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs_f64(1.0),
            max_delay: Duration::from_secs_f64(60.0),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

/// File-sink rotation: size-triggered with a bounded backup count, mirroring
/// `logging.handlers.RotatingFileHandler(maxBytes=..., backupCount=...)`.
#[derive(Debug, Clone, Copy)]
pub struct LoggingSettings {
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            backup_count: 5,
        }
    }
}

/// Top-level configuration for one loader instance. Construct directly for
/// tests, or via [`Config::from_env`] in a running process.
#[derive(Debug, Clone)]
pub struct Config {
    pub fmp: ProviderConfig,
    pub polygon: ProviderConfig,
    pub fred: ProviderConfig,
    pub cache: CacheConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry: RetrySettings,
    pub operating_mode: OperatingMode,
    pub log_level: LogLevel,
    pub logging: LoggingSettings,
    pub project_root: PathBuf,
}

impl Config {
    /// Loads configuration from process environment variables, seeding from
    /// a `.env` file first if one is present. Unset variables fall back to
    /// the defaults documented in §6; malformed values fall back rather than
    /// erroring so that `validate()` remains the single place problems are
    /// reported.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let project_root = find_project_root();
        let cache_base = project_root.join(".cache");

        let ttl_days = env_parse("CACHE_TTL_DAYS", 7u32);
        let max_retries = env_parse("MAX_RETRIES", 3u32);
        let error_threshold = env_parse("CIRCUIT_BREAKER_THRESHOLD", 0.20f64);
        let recovery_timeout = env_parse("CIRCUIT_BREAKER_TIMEOUT", 60.0f64);
        let request_timeout = env_parse("REQUEST_TIMEOUT", 30.0f64);
        let log_max_bytes = env_parse("LOG_MAX_BYTES", 10 * 1024 * 1024u64);
        let log_backup_count = env_parse("LOG_BACKUP_COUNT", 5u32);

        let log_level = std::env::var("LOG_LEVEL")
            .ok()
            .map(|v| LogLevel::from_env_str(&v))
            .unwrap_or(LogLevel::Info);

        let operating_mode = match std::env::var("OPERATING_MODE").ok().as_deref() {
            Some(v) if v.eq_ignore_ascii_case("read_only") || v.eq_ignore_ascii_case("readonly") => {
                OperatingMode::ReadOnly
            }
            _ => OperatingMode::Live,
        };

        let timeout = Duration::from_secs_f64(request_timeout);

        Self {
            fmp: ProviderConfig {
                api_key: std::env::var("FMP_KEY").ok(),
                base_url: FMP_BASE_URL.to_string(),
                max_concurrency: FMP_MAX_CONCURRENCY,
                timeout,
            },
            polygon: ProviderConfig {
                api_key: std::env::var("POLYGON_KEY").ok(),
                base_url: POLYGON_BASE_URL.to_string(),
                max_concurrency: POLYGON_MAX_CONCURRENCY,
                timeout,
            },
            fred: ProviderConfig {
                api_key: std::env::var("FRED_KEY").ok(),
                base_url: FRED_BASE_URL.to_string(),
                max_concurrency: FRED_MAX_CONCURRENCY,
                timeout,
            },
            cache: CacheConfig {
                base_dir: cache_base,
                ttl_days,
                enabled: true,
            },
            circuit_breaker: CircuitBreakerSettings {
                error_threshold,
                recovery_timeout: Duration::from_secs_f64(recovery_timeout),
                min_requests: 10,
            },
            retry: RetrySettings {
                max_retries,
                base_delay: Duration::from_secs_f64(1.0),
                max_delay: Duration::from_secs_f64(60.0),
                exponential_base: 2.0,
                jitter: true,
            },
            operating_mode,
            log_level,
            logging: LoggingSettings {
                max_bytes: log_max_bytes,
                backup_count: log_backup_count,
            },
            project_root,
        }
    }

    /// Accumulates every validation problem rather than stopping at the
    /// first one, so a caller can surface all of them in a single
    /// diagnostic pass.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.operating_mode == OperatingMode::Live {
            if !self.fmp.has_api_key() {
                problems.push("FMP_KEY is required in live mode".to_string());
            }
            if !self.polygon.has_api_key() {
                problems.push("POLYGON_KEY is required in live mode".to_string());
            }
            if !self.fred.has_api_key() {
                problems.push("FRED_KEY is required in live mode".to_string());
            }
        }

        if self.cache.ttl_days < 1 {
            problems.push("CACHE_TTL_DAYS must be at least 1".to_string());
        }
        if self.circuit_breaker.error_threshold <= 0.0 || self.circuit_breaker.error_threshold > 1.0 {
            problems.push("CIRCUIT_BREAKER_THRESHOLD must be in (0, 1]".to_string());
        }
        if self.circuit_breaker.recovery_timeout < Duration::from_secs(1) {
            problems.push("CIRCUIT_BREAKER_TIMEOUT must be at least 1 second".to_string());
        }

        problems
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    pub fn get_cache_dir(&self, provider: &str) -> PathBuf {
        self.cache.provider_dir(provider)
    }

    pub fn get_log_dir(&self) -> PathBuf {
        self.project_root.join("logs")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Walks upward from the current directory looking for a `src/` directory,
/// falling back to the current directory if none is found.
fn find_project_root() -> PathBuf {
    let mut dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    loop {
        if dir.join("src").is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => return std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: OperatingMode) -> Config {
        Config {
            fmp: ProviderConfig {
                api_key: None,
                base_url: FMP_BASE_URL.to_string(),
                max_concurrency: FMP_MAX_CONCURRENCY,
                timeout: Duration::from_secs(30),
            },
            polygon: ProviderConfig {
                api_key: None,
                base_url: POLYGON_BASE_URL.to_string(),
                max_concurrency: POLYGON_MAX_CONCURRENCY,
                timeout: Duration::from_secs(30),
            },
            fred: ProviderConfig {
                api_key: None,
                base_url: FRED_BASE_URL.to_string(),
                max_concurrency: FRED_MAX_CONCURRENCY,
                timeout: Duration::from_secs(30),
            },
            cache: CacheConfig {
                base_dir: PathBuf::from("/tmp/loader-test-cache"),
                ttl_days: 7,
                enabled: true,
            },
            circuit_breaker: CircuitBreakerSettings::default(),
            retry: RetrySettings::default(),
            operating_mode: mode,
            log_level: LogLevel::Info,
            logging: LoggingSettings::default(),
            project_root: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn live_mode_requires_all_three_credentials() {
        let problems = config(OperatingMode::Live).validate();
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn read_only_mode_does_not_require_credentials() {
        assert!(config(OperatingMode::ReadOnly).validate().is_empty());
    }

    #[test]
    fn validate_accumulates_every_problem_instead_of_stopping_at_the_first() {
        let mut c = config(OperatingMode::Live);
        c.cache.ttl_days = 0;
        c.circuit_breaker.error_threshold = 1.5;
        let problems = c.validate();
        assert!(problems.len() >= 5);
    }
}
