use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// One request's outcome, as fed into a provider's rolling window.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub endpoint: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub timestamp: u64,
    pub error_type: Option<String>,
}

/// Aggregated view of a provider's health: cumulative counters since
/// startup, plus error rate and latency derived from the rolling window.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetrics {
    pub provider: String,
    pub status: ProviderStatus,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rate_limited_requests: u64,
    pub timeout_requests: u64,
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub last_success: Option<u64>,
    pub last_error: Option<u64>,
    pub last_error_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: u64,
    pub providers: std::collections::BTreeMap<String, ProviderMetrics>,
    pub overall_status: ProviderStatus,
}

pub(crate) fn now_unix_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs()
}
