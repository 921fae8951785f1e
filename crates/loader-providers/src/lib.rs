//! Provider adapters (C8).
//!
//! Adapters are pure: URL and query construction, response normalization and
//! cache-key derivation, no I/O. The orchestrator is the only caller that
//! talks to the network, the cache, or the health registry.

mod error;
pub mod providers;

pub use error::AdapterError;

use loader_core::{JsonValue, Params};
use loader_registry::EndpointRegistry;
use std::collections::BTreeMap;

pub trait ProviderAdapter: Send + Sync {
    /// Short, stable identifier used throughout the system (e.g. `"fmp"`).
    fn name(&self) -> &str;

    fn registry(&self) -> &EndpointRegistry;

    /// Substitutes path tokens (`{symbol}`, `{start}`, ...) with param
    /// values. Fails if a token in the path template has no value.
    fn build_url(&self, endpoint: &str, params: &Params) -> Result<String, AdapterError>;

    /// Final query map including the provider's auth parameter, restricted
    /// to parameters the endpoint actually declares.
    fn build_query(&self, endpoint: &str, params: &Params) -> Result<BTreeMap<String, String>, AdapterError>;

    /// Reshapes a raw response body into this provider's caller-stable
    /// shape. Pure; never touches the network.
    fn normalize(&self, raw: &JsonValue, endpoint: &str) -> JsonValue;

    /// Deterministic function of endpoint and params, excluding any
    /// credential. Sorted iteration over `Params` (a `BTreeMap`) makes this
    /// naturally order-independent.
    fn cache_key(&self, endpoint: &str, params: &Params) -> String;

    fn validate_endpoint(&self, endpoint: &str) -> bool {
        self.registry().exists(endpoint)
    }
}

/// Builds the deterministic, not-yet-filesystem-sanitized cache key shared
/// by every adapter: `{endpoint}` alone, or `{endpoint}_{k}={v}_{k}={v}...`
/// over the endpoint's declared params present in `params`, sorted by key.
pub fn derive_cache_key(endpoint: &str, params: &Params) -> String {
    let parts: Vec<String> = params
        .iter()
        .filter_map(|(k, v)| param_to_string(v).map(|s| format!("{k}={s}")))
        .collect();

    let raw = if parts.is_empty() {
        endpoint.to_string()
    } else {
        format!("{endpoint}_{}", parts.join("_"))
    };

    loader_cache::sanitize_key(&raw)
}

pub(crate) fn param_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn require_param(
    params: &Params,
    endpoint: &str,
    name: &str,
) -> Result<String, AdapterError> {
    params
        .get(name)
        .and_then(param_to_string)
        .ok_or_else(|| AdapterError::MissingParam {
            endpoint: endpoint.to_string(),
            param: name.to_string(),
        })
}
