//! Loader Orchestrator (C9): the composition of every other component into
//! the single `fetch` operation callers actually use.

use crate::config::Config;
use loader_cache::CacheStore;
use loader_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitStats};
use loader_core::{ErrorKind, FetchResponse, OperatingMode, OperatingModeCell, Params};
use loader_gate::{ConcurrencyGate, GateStats};
use loader_health::{HealthReport, HealthRegistry};
use loader_providers::providers::{FmpAdapter, FredAdapter, PolygonAdapter};
use loader_providers::ProviderAdapter;
use loader_retry::{RetryConfig, RetryDriver, RetryExhaustedError};
use loader_transport::{HttpMethod, HttpTransport};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// The two conditions `fetch` raises instead of folding into a failure
/// response: both are control-flow signals a caller may choose to handle
/// specially (e.g. retry later, surface a maintenance banner), not ordinary
/// API failures.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("read-only mode: provider '{provider}' endpoint '{endpoint}' has no cached entry")]
    ReadOnly { provider: String, endpoint: String },

    #[error("circuit breaker open for provider '{provider}' (state: {state:?})")]
    CircuitOpen {
        provider: String,
        state: loader_circuitbreaker::CircuitState,
    },
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct LoaderStatsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub api_calls: u64,
    pub api_successes: u64,
    pub api_failures: u64,
    pub circuit_breaker_rejections: u64,
    pub cache_hit_rate: f64,
}

#[derive(Default)]
struct LoaderStats {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    api_calls: AtomicU64,
    api_successes: AtomicU64,
    api_failures: AtomicU64,
    circuit_breaker_rejections: AtomicU64,
}

impl LoaderStats {
    fn snapshot(&self) -> LoaderStatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        LoaderStatsSnapshot {
            total_requests,
            cache_hits,
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            api_successes: self.api_successes.load(Ordering::Relaxed),
            api_failures: self.api_failures.load(Ordering::Relaxed),
            circuit_breaker_rejections: self.circuit_breaker_rejections.load(Ordering::Relaxed),
            cache_hit_rate: if total_requests > 0 {
                cache_hits as f64 / total_requests as f64
            } else {
                0.0
            },
        }
    }
}

/// Composite health/report object returned by [`LoaderOrchestrator::api_health_report`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiHealthReport {
    pub timestamp: u64,
    pub operating_mode: &'static str,
    pub health: HealthReport,
    pub breakers: BTreeMap<String, BreakerSnapshot>,
    pub gates: BTreeMap<String, GateSnapshot>,
    pub stats: LoaderStatsSnapshot,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct BreakerSnapshot {
    pub state: &'static str,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub error_rate: f64,
}

impl From<CircuitStats> for BreakerSnapshot {
    fn from(s: CircuitStats) -> Self {
        Self {
            state: match s.state {
                loader_circuitbreaker::CircuitState::Closed => "closed",
                loader_circuitbreaker::CircuitState::Open => "open",
                loader_circuitbreaker::CircuitState::HalfOpen => "half_open",
            },
            total_requests: s.total_requests,
            successful_requests: s.successful_requests,
            failed_requests: s.failed_requests,
            error_rate: s.error_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GateSnapshot {
    pub max_concurrency: usize,
    pub active: usize,
    pub peak_concurrent: usize,
}

impl From<GateStats> for GateSnapshot {
    fn from(s: GateStats) -> Self {
        Self {
            max_concurrency: s.max_concurrency,
            active: s.active,
            peak_concurrent: s.peak_concurrent,
        }
    }
}

/// Wires C1–C8 together behind the single `fetch` entry point (§4.9).
pub struct LoaderOrchestrator {
    cache: CacheStore,
    gate: ConcurrencyGate,
    breakers: CircuitBreakerRegistry,
    retry: RetryDriver,
    health: HealthRegistry,
    transport: HttpTransport,
    adapters: HashMap<String, Box<dyn ProviderAdapter>>,
    timeouts: HashMap<String, Duration>,
    mode: OperatingModeCell,
    stats: LoaderStats,
}

impl LoaderOrchestrator {
    pub fn new(config: &Config) -> Self {
        let mut adapters: HashMap<String, Box<dyn ProviderAdapter>> = HashMap::new();
        adapters.insert(
            "fmp".to_string(),
            Box::new(FmpAdapter::new(
                config.fmp.base_url.clone(),
                config.fmp.api_key.clone().unwrap_or_default(),
            )),
        );
        adapters.insert(
            "polygon".to_string(),
            Box::new(PolygonAdapter::new(
                config.polygon.base_url.clone(),
                config.polygon.api_key.clone().unwrap_or_default(),
            )),
        );
        adapters.insert(
            "fred".to_string(),
            Box::new(FredAdapter::new(
                config.fred.base_url.clone(),
                config.fred.api_key.clone().unwrap_or_default(),
            )),
        );

        let mut timeouts = HashMap::new();
        timeouts.insert("fmp".to_string(), config.fmp.timeout);
        timeouts.insert("polygon".to_string(), config.polygon.timeout);
        timeouts.insert("fred".to_string(), config.fred.timeout);

        let gate = ConcurrencyGate::new(vec![
            ("fmp", config.fmp.max_concurrency),
            ("polygon", config.polygon.max_concurrency),
            ("fred", config.fred.max_concurrency),
        ]);

        let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig {
            error_threshold: config.circuit_breaker.error_threshold,
            recovery_timeout: config.circuit_breaker.recovery_timeout,
            min_requests: config.circuit_breaker.min_requests,
            ..CircuitBreakerConfig::default()
        });

        let retry = RetryDriver::new(RetryConfig {
            max_retries: config.retry.max_retries,
            base_delay: config.retry.base_delay,
            max_delay: config.retry.max_delay,
            exponential_base: config.retry.exponential_base,
            jitter: config.retry.jitter,
            ..RetryConfig::default()
        });

        Self {
            cache: if config.cache.enabled {
                CacheStore::new(config.cache.base_dir.clone(), config.cache.ttl_days)
            } else {
                CacheStore::disabled(config.cache.base_dir.clone())
            },
            gate,
            breakers,
            retry,
            health: HealthRegistry::default(),
            transport: HttpTransport::new(Duration::from_secs(30)),
            adapters,
            timeouts,
            mode: OperatingModeCell::new(config.operating_mode),
            stats: LoaderStats::default(),
        }
    }

    pub fn set_operating_mode(&self, mode: OperatingMode) {
        self.mode.set(mode);
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.mode.get()
    }

    /// The single retrieval operation (§4.9). See the module-level
    /// algorithm description for the normative step ordering.
    pub async fn fetch(
        &self,
        provider: &str,
        endpoint: &str,
        params: &Params,
        use_cache: bool,
    ) -> Result<FetchResponse, OrchestratorError> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);

        let adapter = match self.adapters.get(provider) {
            Some(adapter) => adapter,
            None => {
                return Ok(FetchResponse::Failure {
                    provider: provider.to_string(),
                    endpoint: endpoint.to_string(),
                    error: format!("unknown provider '{provider}'"),
                    from_cache: false,
                    elapsed_ms: 0,
                });
            }
        };

        if !adapter.validate_endpoint(endpoint) {
            return Ok(FetchResponse::Failure {
                provider: provider.to_string(),
                endpoint: endpoint.to_string(),
                error: format!("unknown endpoint '{endpoint}' for provider '{provider}'"),
                from_cache: false,
                elapsed_ms: 0,
            });
        }

        let cache_key = adapter.cache_key(endpoint, params);

        if use_cache {
            if let Ok(Some(entry)) = self.cache.get(provider, &cache_key, false) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(provider, endpoint, "cache hit");
                return Ok(FetchResponse::Success {
                    provider: provider.to_string(),
                    endpoint: endpoint.to_string(),
                    data: entry.data,
                    from_cache: true,
                    elapsed_ms: 0,
                });
            }
        }
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        if self.mode.get() == OperatingMode::ReadOnly {
            return Err(OrchestratorError::ReadOnly {
                provider: provider.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        if let Err(err) = self.breakers.check(provider) {
            self.stats.circuit_breaker_rejections.fetch_add(1, Ordering::Relaxed);
            return Err(OrchestratorError::CircuitOpen {
                provider: provider.to_string(),
                state: err.state,
            });
        }

        let _slot = self.gate.acquire(provider).await;

        let url = adapter.build_url(endpoint, params);
        let query = adapter.build_query(endpoint, params);
        let (url, query) = match (url, query) {
            (Ok(u), Ok(q)) => (u, q),
            (Err(e), _) | (_, Err(e)) => {
                return Ok(FetchResponse::Failure {
                    provider: provider.to_string(),
                    endpoint: endpoint.to_string(),
                    error: e.to_string(),
                    from_cache: false,
                    elapsed_ms: 0,
                });
            }
        };

        let timeout = self.timeouts.get(provider).copied();
        let start = Instant::now();

        let outcome = self
            .retry
            .execute(provider, move || {
                let url = url.clone();
                let query = query.clone();
                async move {
                    self.transport
                        .perform(HttpMethod::Get, &url, &query, &BTreeMap::new(), None, timeout)
                        .await
                }
            })
            .await;

        self.stats.api_calls.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok(retry_outcome) => {
                let response = retry_outcome.value;
                self.stats.api_successes.fetch_add(1, Ordering::Relaxed);
                self.breakers.record_success(provider);
                self.health
                    .record_success(provider, endpoint, response.elapsed_ms, response.status);

                let normalized = adapter.normalize(&response.data, endpoint);

                if use_cache {
                    if let Err(err) = self.cache.set(provider, &cache_key, normalized.clone(), None) {
                        tracing::warn!(provider, endpoint, error = %err, "failed to write cache entry");
                    }
                }

                tracing::info!(provider, endpoint, attempts = retry_outcome.attempts, "fetch succeeded");

                Ok(FetchResponse::Success {
                    provider: provider.to_string(),
                    endpoint: endpoint.to_string(),
                    data: normalized,
                    from_cache: false,
                    elapsed_ms: response.elapsed_ms.round() as u64,
                })
            }
            Err(exhausted) => {
                self.stats.api_failures.fetch_add(1, Ordering::Relaxed);
                self.breakers.record_failure(provider);

                let kind = exhausted.last_error.kind();
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                self.health.record_failure(
                    provider,
                    endpoint,
                    elapsed_ms,
                    exhausted.last_error.status_code(),
                    Some(error_type_tag(kind)),
                );

                tracing::warn!(provider, endpoint, attempts = exhausted.attempts, error = %exhausted, "fetch failed");

                Ok(FetchResponse::Failure {
                    provider: provider.to_string(),
                    endpoint: endpoint.to_string(),
                    error: failure_message(&exhausted),
                    from_cache: false,
                    elapsed_ms: elapsed_ms.round() as u64,
                })
            }
        }
    }

    pub fn api_health_report(&self) -> ApiHealthReport {
        let mut breakers = BTreeMap::new();
        let mut gates = BTreeMap::new();
        for provider in self.adapters.keys() {
            breakers.insert(provider.clone(), self.breakers.stats(provider).into());
            gates.insert(provider.clone(), self.gate.stats(provider).into());
        }

        ApiHealthReport {
            timestamp: self.health.health_report().timestamp,
            operating_mode: match self.mode.get() {
                OperatingMode::Live => "live",
                OperatingMode::ReadOnly => "read_only",
            },
            health: self.health.health_report(),
            breakers,
            gates,
            stats: self.stats.snapshot(),
        }
    }

    pub fn provider_status(&self, provider: &str) -> loader_health::ProviderStatus {
        self.health.provider_status(provider)
    }

    /// A provider is healthy only when both the health registry and the
    /// circuit breaker agree — either one can veto.
    pub fn is_provider_healthy(&self, provider: &str) -> bool {
        self.health.is_healthy(provider) && self.breakers.state(provider) != loader_circuitbreaker::CircuitState::Open
    }

    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_circuit_breaker(&self, provider: Option<&str>) {
        self.breakers.reset(provider);
    }

    pub fn reset_health_monitor(&self, provider: Option<&str>) {
        self.health.reset(provider);
    }

    pub fn supported_endpoints(&self, provider: &str) -> Option<Vec<String>> {
        self.adapters
            .get(provider)
            .map(|a| a.registry().names().into_iter().map(str::to_string).collect())
    }
}

fn error_type_tag(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Timeout => "timeout",
        ErrorKind::Connection => "connection",
        ErrorKind::RateLimit => "rate_limit",
        ErrorKind::ServerError => "server_error",
        ErrorKind::ClientError => "client_error",
        ErrorKind::Unexpected => "unexpected",
    }
}

/// When retries actually happened before giving up, lead with the
/// machine-greppable "All retries exhausted" token; a single non-retryable
/// attempt (e.g. a 404) surfaces its own kind-prefixed message directly,
/// since no retrying was ever attempted.
fn failure_message(exhausted: &RetryExhaustedError) -> String {
    if exhausted.attempts > 1 {
        format!("All retries exhausted: {}", exhausted.last_error)
    } else {
        exhausted.last_error.to_string()
    }
}

impl std::fmt::Debug for LoaderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderOrchestrator")
            .field("operating_mode", &self.operating_mode())
            .field("providers", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
