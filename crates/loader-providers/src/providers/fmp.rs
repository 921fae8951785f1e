use crate::{derive_cache_key, AdapterError, ProviderAdapter};
use loader_core::{JsonValue, Params};
use loader_registry::{EndpointDescriptor, EndpointRegistry, Tier};
use std::collections::BTreeMap;

struct EndpointConfig {
    name: &'static str,
    path: &'static str,
    category: &'static str,
    params: &'static [&'static str],
}

const ENDPOINTS: &[EndpointConfig] = &[
    EndpointConfig { name: "screener", path: "/stable/company-screener", category: "search", params: &["marketCapMoreThan", "marketCapLowerThan", "sector", "industry", "country", "exchange", "limit"] },
    EndpointConfig { name: "profile", path: "/stable/profile", category: "company", params: &["symbol"] },
    EndpointConfig { name: "quote", path: "/stable/quote", category: "quotes", params: &["symbol"] },
    EndpointConfig { name: "historical_price", path: "/stable/historical-price-eod/full", category: "charts", params: &["symbol", "from", "to"] },
    EndpointConfig { name: "earnings_calendar", path: "/stable/earnings-calendar", category: "calendars", params: &["symbol", "from", "to"] },
    EndpointConfig { name: "balance_sheet", path: "/stable/balance-sheet-statement", category: "financials", params: &["symbol", "period", "limit"] },
    EndpointConfig { name: "income_statement", path: "/stable/income-statement", category: "financials", params: &["symbol", "period", "limit"] },
    EndpointConfig { name: "cash_flow", path: "/stable/cash-flow-statement", category: "financials", params: &["symbol", "period", "limit"] },
    EndpointConfig { name: "ratios", path: "/stable/ratios", category: "financials", params: &["symbol", "period", "limit"] },
    EndpointConfig { name: "growth", path: "/stable/financial-growth", category: "financials", params: &["symbol", "period", "limit"] },
    EndpointConfig { name: "key_metrics", path: "/stable/key-metrics", category: "financials", params: &["symbol", "period", "limit"] },
    EndpointConfig { name: "insider_trading", path: "/stable/insider-trading/search", category: "insider", params: &["symbol", "page", "limit"] },
    EndpointConfig { name: "institutional_ownership", path: "/stable/institutional-ownership/latest", category: "institutional", params: &["symbol"] },
];

/// Financial Modeling Prep adapter. Auth parameter is `apikey`.
pub struct FmpAdapter {
    base_url: String,
    api_key: String,
    registry: EndpointRegistry,
}

impl FmpAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut registry = EndpointRegistry::new();
        for ep in ENDPOINTS {
            // FMP's `/stable/...` paths are all static; every declared
            // parameter (including `symbol`) travels as a query param, none
            // as a path token, so none is structurally required here.
            registry.register(EndpointDescriptor {
                name: ep.name.to_string(),
                path_template: ep.path.to_string(),
                category: ep.category.to_string(),
                tier: Tier::Free,
                description: String::new(),
                required_params: vec![],
                optional_params: ep.params.iter().map(|p| p.to_string()).collect(),
            });
        }
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            registry,
        }
    }

    fn endpoint_config(&self, endpoint: &str) -> Result<&'static EndpointConfig, AdapterError> {
        ENDPOINTS
            .iter()
            .find(|ep| ep.name == endpoint)
            .ok_or_else(|| AdapterError::UnknownEndpoint(endpoint.to_string()))
    }
}

impl ProviderAdapter for FmpAdapter {
    fn name(&self) -> &str {
        "fmp"
    }

    fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    fn build_url(&self, endpoint: &str, _params: &Params) -> Result<String, AdapterError> {
        let config = self.endpoint_config(endpoint)?;
        Ok(format!("{}{}", self.base_url, config.path))
    }

    fn build_query(&self, endpoint: &str, params: &Params) -> Result<BTreeMap<String, String>, AdapterError> {
        let config = self.endpoint_config(endpoint)?;
        let mut query = BTreeMap::new();
        query.insert("apikey".to_string(), self.api_key.clone());
        for name in config.params {
            if let Some(value) = params.get(*name).and_then(crate::param_to_string) {
                query.insert((*name).to_string(), value);
            }
        }
        Ok(query)
    }

    fn normalize(&self, raw: &JsonValue, endpoint: &str) -> JsonValue {
        if let Some(message) = raw.get("Error Message") {
            return serde_json::json!({"error": message, "data": JsonValue::Null});
        }

        match endpoint {
            "historical_price" => {
                if let Some(historical) = raw.get("historical") {
                    return serde_json::json!({
                        "symbol": raw.get("symbol"),
                        "historical": historical,
                    });
                }
                raw.clone()
            }
            "profile" | "quote" => {
                if let Some(items) = raw.as_array() {
                    if items.len() == 1 {
                        return items[0].clone();
                    }
                }
                raw.clone()
            }
            _ => raw.clone(),
        }
    }

    fn cache_key(&self, endpoint: &str, params: &Params) -> String {
        derive_cache_key(endpoint, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), JsonValue::String(v.to_string())))
            .collect()
    }

    #[test]
    fn build_url_substitutes_nothing_for_flat_endpoints() {
        let adapter = FmpAdapter::new("https://fmp.example", "secret");
        let url = adapter.build_url("quote", &params(&[("symbol", "AAPL")])).unwrap();
        assert_eq!(url, "https://fmp.example/stable/quote");
    }

    #[test]
    fn build_query_always_injects_apikey() {
        let adapter = FmpAdapter::new("https://fmp.example", "secret");
        let query = adapter.build_query("quote", &params(&[("symbol", "AAPL")])).unwrap();
        assert_eq!(query.get("apikey"), Some(&"secret".to_string()));
        assert_eq!(query.get("symbol"), Some(&"AAPL".to_string()));
    }

    #[test]
    fn build_query_drops_params_not_declared_by_the_endpoint() {
        let adapter = FmpAdapter::new("https://fmp.example", "secret");
        let query = adapter
            .build_query("quote", &params(&[("symbol", "AAPL"), ("bogus", "x")]))
            .unwrap();
        assert!(!query.contains_key("bogus"));
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let adapter = FmpAdapter::new("https://fmp.example", "secret");
        assert!(!adapter.validate_endpoint("nonexistent"));
        assert!(adapter.build_url("nonexistent", &Params::new()).is_err());
    }

    #[test]
    fn normalize_unwraps_single_element_quote_list() {
        let adapter = FmpAdapter::new("https://fmp.example", "secret");
        let raw = serde_json::json!([{"symbol": "AAPL", "price": 190.1}]);
        let normalized = adapter.normalize(&raw, "quote");
        assert_eq!(normalized["symbol"], "AAPL");
    }

    #[test]
    fn cache_key_ignores_param_order() {
        let adapter = FmpAdapter::new("https://fmp.example", "secret");
        let a = adapter.cache_key("ratios", &params(&[("symbol", "AAPL"), ("period", "annual")]));
        let b = adapter.cache_key("ratios", &params(&[("period", "annual"), ("symbol", "AAPL")]));
        assert_eq!(a, b);
    }
}
