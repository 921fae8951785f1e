use crate::{derive_cache_key, require_param, AdapterError, ProviderAdapter};
use loader_core::{JsonValue, Params};
use loader_registry::{EndpointDescriptor, EndpointRegistry, Tier};
use std::collections::BTreeMap;

struct EndpointConfig {
    name: &'static str,
    path: &'static str,
    category: &'static str,
    path_tokens: &'static [&'static str],
    params: &'static [&'static str],
}

const ENDPOINTS: &[EndpointConfig] = &[
    EndpointConfig {
        name: "aggs_daily",
        path: "/v2/aggs/ticker/{symbol}/range/1/day/{start}/{end}",
        category: "charts",
        path_tokens: &["symbol", "start", "end"],
        params: &["adjusted", "sort", "limit"],
    },
    EndpointConfig {
        name: "trades",
        path: "/v3/trades/{symbol}",
        category: "quotes",
        path_tokens: &["symbol"],
        params: &["timestamp", "timestamp.gte", "timestamp.lte", "order", "limit", "sort"],
    },
    EndpointConfig {
        name: "options_snapshot",
        path: "/v3/snapshot/options/{underlyingAsset}",
        category: "etf",
        path_tokens: &["underlyingAsset"],
        params: &["strike_price", "expiration_date", "contract_type", "order", "limit", "sort"],
    },
    EndpointConfig {
        name: "market_snapshot",
        path: "/v2/snapshot/locale/us/markets/stocks/tickers",
        category: "quotes",
        path_tokens: &[],
        params: &["tickers", "include_otc"],
    },
];

/// Polygon.io adapter. Auth parameter is `apiKey`.
pub struct PolygonAdapter {
    base_url: String,
    api_key: String,
    registry: EndpointRegistry,
}

impl PolygonAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut registry = EndpointRegistry::new();
        for ep in ENDPOINTS {
            registry.register(EndpointDescriptor {
                name: ep.name.to_string(),
                path_template: ep.path.to_string(),
                category: ep.category.to_string(),
                tier: Tier::Free,
                description: String::new(),
                required_params: ep.path_tokens.iter().map(|t| (*t).to_string()).collect(),
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

impl ProviderAdapter for PolygonAdapter {
    fn name(&self) -> &str {
        "polygon"
    }

    fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    fn build_url(&self, endpoint: &str, params: &Params) -> Result<String, AdapterError> {
        let config = self.endpoint_config(endpoint)?;
        let mut path = config.path.to_string();

        for token in config.path_tokens {
            let placeholder = format!("{{{token}}}");
            // `options_snapshot` accepts either `underlyingAsset` or `symbol`.
            let value = if *token == "underlyingAsset" && !params.contains_key("underlyingAsset") {
                require_param(params, endpoint, "symbol")?
            } else {
                require_param(params, endpoint, token)?
            };
            path = path.replace(&placeholder, &value);
        }

        Ok(format!("{}{}", self.base_url, path))
    }

    fn build_query(&self, endpoint: &str, params: &Params) -> Result<BTreeMap<String, String>, AdapterError> {
        let config = self.endpoint_config(endpoint)?;
        let mut query = BTreeMap::new();
        query.insert("apiKey".to_string(), self.api_key.clone());
        for name in config.params {
            if let Some(value) = params.get(*name).and_then(crate::param_to_string) {
                query.insert((*name).to_string(), value);
            }
        }
        Ok(query)
    }

    fn normalize(&self, raw: &JsonValue, _endpoint: &str) -> JsonValue {
        raw.clone()
    }

    fn cache_key(&self, endpoint: &str, params: &Params) -> String {
        derive_cache_key(endpoint, params)
    }
}
