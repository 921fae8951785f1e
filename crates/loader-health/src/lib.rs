//! Rolling per-provider health metrics (C6).

mod model;

pub use model::{HealthReport, ProviderMetrics, ProviderStatus, RequestRecord};

use dashmap::DashMap;
use model::now_unix_seconds;
use parking_lot::Mutex;
use std::collections::VecDeque;

const DEFAULT_WINDOW_SIZE: usize = 100;
const ERROR_RATE_DEGRADED: f64 = 0.1;
const ERROR_RATE_UNHEALTHY: f64 = 0.2;
const MIN_REQUESTS_FOR_STATUS: u64 = 10;

#[derive(Default)]
struct Counters {
    total: u64,
    success: u64,
    failed: u64,
    rate_limited: u64,
    timeout: u64,
}

struct ProviderState {
    history: VecDeque<RequestRecord>,
    counters: Counters,
}

impl ProviderState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            counters: Counters::default(),
        }
    }
}

/// Tracks request outcomes per provider and classifies each one as
/// healthy/degraded/unhealthy/unknown. Providers are created lazily on
/// first use, same as the gate and circuit breaker registries, so no
/// provider's bookkeeping contends with another's lock.
pub struct HealthRegistry {
    window_size: usize,
    providers: DashMap<String, Mutex<ProviderState>>,
}

impl HealthRegistry {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            providers: DashMap::new(),
        }
    }

    fn entry(&self, provider: &str) -> dashmap::mapref::one::RefMut<'_, String, Mutex<ProviderState>> {
        self.providers
            .entry(provider.to_string())
            .or_insert_with(|| Mutex::new(ProviderState::new()))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_request(
        &self,
        provider: &str,
        endpoint: &str,
        success: bool,
        status_code: Option<u16>,
        latency_ms: f64,
        error_type: Option<&str>,
    ) {
        let record = RequestRecord {
            endpoint: endpoint.to_string(),
            success,
            status_code,
            latency_ms,
            timestamp: now_unix_seconds(),
            error_type: error_type.map(str::to_string),
        };

        let state = self.entry(provider);
        let mut state = state.lock();

        if state.history.len() == self.window_size {
            state.history.pop_front();
        }
        state.history.push_back(record);

        state.counters.total += 1;
        if success {
            state.counters.success += 1;
        } else {
            state.counters.failed += 1;
            if status_code == Some(429) {
                state.counters.rate_limited += 1;
            }
            if error_type == Some("timeout") {
                state.counters.timeout += 1;
            }
        }

        tracing::trace!(provider, endpoint, success, "health observation recorded");
    }

    pub fn record_success(&self, provider: &str, endpoint: &str, latency_ms: f64, status_code: u16) {
        self.record_request(provider, endpoint, true, Some(status_code), latency_ms, None);
    }

    pub fn record_failure(
        &self,
        provider: &str,
        endpoint: &str,
        latency_ms: f64,
        status_code: Option<u16>,
        error_type: Option<&str>,
    ) {
        self.record_request(provider, endpoint, false, status_code, latency_ms, error_type);
    }

    pub fn provider_metrics(&self, provider: &str) -> ProviderMetrics {
        let state = self.entry(provider);
        let state = state.lock();

        let mut metrics = ProviderMetrics {
            provider: provider.to_string(),
            status: ProviderStatus::Unknown,
            total_requests: state.counters.total,
            successful_requests: state.counters.success,
            failed_requests: state.counters.failed,
            rate_limited_requests: state.counters.rate_limited,
            timeout_requests: state.counters.timeout,
            error_rate: 0.0,
            avg_latency_ms: 0.0,
            min_latency_ms: 0.0,
            max_latency_ms: 0.0,
            last_success: None,
            last_error: None,
            last_error_type: None,
        };

        if !state.history.is_empty() {
            let recent_failures = state.history.iter().filter(|r| !r.success).count();
            metrics.error_rate = recent_failures as f64 / state.history.len() as f64;

            let latencies: Vec<f64> = state.history.iter().map(|r| r.latency_ms).collect();
            metrics.avg_latency_ms = latencies.iter().sum::<f64>() / latencies.len() as f64;
            metrics.min_latency_ms = latencies.iter().cloned().fold(f64::INFINITY, f64::min);
            metrics.max_latency_ms = latencies.iter().cloned().fold(0.0, f64::max);

            for record in state.history.iter().rev() {
                if record.success && metrics.last_success.is_none() {
                    metrics.last_success = Some(record.timestamp);
                }
                if !record.success && metrics.last_error.is_none() {
                    metrics.last_error = Some(record.timestamp);
                    metrics.last_error_type = record.error_type.clone();
                }
                if metrics.last_success.is_some() && metrics.last_error.is_some() {
                    break;
                }
            }
        }

        metrics.status = classify(&metrics);
        metrics
    }

    pub fn provider_status(&self, provider: &str) -> ProviderStatus {
        self.provider_metrics(provider).status
    }

    /// True when a provider is healthy or unknown (not enough data yet) —
    /// callers use this to decide whether it's worth trying a provider at
    /// all, not just to report status.
    pub fn is_healthy(&self, provider: &str) -> bool {
        matches!(
            self.provider_status(provider),
            ProviderStatus::Healthy | ProviderStatus::Unknown
        )
    }

    pub fn error_rate(&self, provider: &str) -> f64 {
        self.provider_metrics(provider).error_rate
    }

    pub fn avg_latency_ms(&self, provider: &str) -> f64 {
        self.provider_metrics(provider).avg_latency_ms
    }

    /// Report across every provider that has recorded at least one request.
    /// Overall status is the worst of the per-provider statuses; it's
    /// `Unknown` only when every provider is `Unknown`, and `Healthy`
    /// otherwise (including when there are no providers at all).
    pub fn health_report(&self) -> HealthReport {
        let names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        let providers: std::collections::BTreeMap<String, ProviderMetrics> = names
            .into_iter()
            .map(|name| {
                let metrics = self.provider_metrics(&name);
                (name, metrics)
            })
            .collect();

        let overall_status = if providers
            .values()
            .any(|m| m.status == ProviderStatus::Unhealthy)
        {
            ProviderStatus::Unhealthy
        } else if providers
            .values()
            .any(|m| m.status == ProviderStatus::Degraded)
        {
            ProviderStatus::Degraded
        } else if !providers.is_empty()
            && providers
                .values()
                .all(|m| m.status == ProviderStatus::Unknown)
        {
            ProviderStatus::Unknown
        } else {
            ProviderStatus::Healthy
        };

        HealthReport {
            timestamp: now_unix_seconds(),
            providers,
            overall_status,
        }
    }

    pub fn reset(&self, provider: Option<&str>) {
        match provider {
            Some(p) => {
                if let Some(state) = self.providers.get(p) {
                    let mut state = state.lock();
                    state.history.clear();
                    state.counters = Counters::default();
                }
            }
            None => {
                for entry in self.providers.iter() {
                    let mut state = entry.value().lock();
                    state.history.clear();
                    state.counters = Counters::default();
                }
            }
        }
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

fn classify(metrics: &ProviderMetrics) -> ProviderStatus {
    if metrics.total_requests < MIN_REQUESTS_FOR_STATUS {
        return ProviderStatus::Unknown;
    }
    if metrics.error_rate >= ERROR_RATE_UNHEALTHY {
        return ProviderStatus::Unhealthy;
    }
    if metrics.error_rate >= ERROR_RATE_DEGRADED {
        return ProviderStatus::Degraded;
    }
    ProviderStatus::Healthy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(registry: &HealthRegistry, provider: &str, successes: u32, failures: u32) {
        for _ in 0..successes {
            registry.record_success(provider, "quote", 50.0, 200);
        }
        for _ in 0..failures {
            registry.record_failure(provider, "quote", 50.0, Some(500), None);
        }
    }

    #[test]
    fn unknown_below_minimum_requests() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 5, 0);
        assert_eq!(registry.provider_status("fmp"), ProviderStatus::Unknown);
    }

    #[test]
    fn healthy_below_degraded_threshold() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 19, 1);
        assert_eq!(registry.provider_status("fmp"), ProviderStatus::Healthy);
    }

    #[test]
    fn degraded_at_ten_percent() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 9, 1);
        assert_eq!(registry.provider_status("fmp"), ProviderStatus::Degraded);
    }

    #[test]
    fn unhealthy_at_twenty_percent() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 8, 2);
        assert_eq!(registry.provider_status("fmp"), ProviderStatus::Unhealthy);
    }

    #[test]
    fn providers_are_isolated() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 8, 2);
        fill(&registry, "polygon", 20, 0);
        assert_eq!(registry.provider_status("fmp"), ProviderStatus::Unhealthy);
        assert_eq!(registry.provider_status("polygon"), ProviderStatus::Healthy);
    }

    #[test]
    fn overall_status_is_worst_of_all_providers() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 8, 2);
        fill(&registry, "polygon", 20, 0);
        let report = registry.health_report();
        assert_eq!(report.overall_status, ProviderStatus::Unhealthy);
    }

    #[test]
    fn reset_clears_history_and_counters() {
        let registry = HealthRegistry::default();
        fill(&registry, "fmp", 8, 2);
        registry.reset(Some("fmp"));
        assert_eq!(registry.provider_status("fmp"), ProviderStatus::Unknown);
    }

    #[test]
    fn rolling_window_drops_oldest_beyond_capacity() {
        let registry = HealthRegistry::new(5);
        fill(&registry, "fmp", 10, 0);
        let metrics = registry.provider_metrics("fmp");
        assert_eq!(metrics.total_requests, 10);
    }
}
