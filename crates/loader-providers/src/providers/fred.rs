use crate::{derive_cache_key, require_param, AdapterError, ProviderAdapter};
use loader_core::{JsonValue, Params};
use loader_registry::{EndpointDescriptor, EndpointRegistry, Tier};
use std::collections::BTreeMap;

struct EndpointConfig {
    name: &'static str,
    path: &'static str,
    params: &'static [&'static str],
}

const ENDPOINTS: &[EndpointConfig] = &[
    EndpointConfig {
        name: "series",
        path: "/series/observations",
        params: &[
            "series_id",
            "observation_start",
            "observation_end",
            "units",
            "frequency",
            "aggregation_method",
            "sort_order",
            "limit",
            "offset",
        ],
    },
    EndpointConfig {
        name: "series_info",
        path: "/series",
        params: &["series_id"],
    },
    EndpointConfig {
        name: "releases",
        path: "/releases",
        params: &["limit", "offset", "order_by", "sort_order"],
    },
];

/// 32 macroeconomic series this adapter's seed catalog recognizes, grouped
/// the way the upstream reference implementation groups them. Exposed so
/// callers can validate or list a series without a round trip.
pub const SERIES: &[(&str, &str)] = &[
    ("CPIAUCSL", "Consumer Price Index"),
    ("CPILFESL", "Core CPI (Less Food and Energy)"),
    ("PCEPI", "PCE Price Index"),
    ("PCEPILFE", "Core PCE Price Index"),
    ("PPIFIS", "Producer Price Index"),
    ("UNRATE", "Unemployment Rate"),
    ("PAYEMS", "Nonfarm Payrolls"),
    ("CIVPART", "Labor Force Participation Rate"),
    ("AHETPI", "Average Hourly Earnings"),
    ("ICSA", "Initial Jobless Claims"),
    ("CCSA", "Continued Jobless Claims"),
    ("JTSJOL", "Job Openings (JOLTS)"),
    ("GDP", "Gross Domestic Product"),
    ("GDPC1", "Real GDP"),
    ("GDI", "Gross Domestic Income"),
    ("INDPRO", "Industrial Production Index"),
    ("UMCSENT", "Consumer Sentiment (UMich)"),
    ("CSUSHPINSA", "Case-Shiller Home Price Index"),
    ("HOUST", "Housing Starts"),
    ("PERMIT", "Building Permits"),
    ("HSN1F", "New Home Sales"),
    ("EXHOSLUSM495S", "Existing Home Sales"),
    ("FEDFUNDS", "Federal Funds Rate"),
    ("DFF", "Effective Federal Funds Rate"),
    ("DGS2", "2-Year Treasury Yield"),
    ("DGS10", "10-Year Treasury Yield"),
    ("DGS30", "30-Year Treasury Yield"),
    ("T10Y2Y", "10Y-2Y Treasury Spread"),
    ("T10Y3M", "10Y-3M Treasury Spread"),
    ("M2SL", "M2 Money Supply"),
    ("TOTALSL", "Consumer Credit"),
    ("VIXCLS", "VIX Volatility Index"),
];

/// Federal Reserve Economic Data adapter.
///
/// Auth quirk (reproduced verbatim, not "fixed"): the credential is
/// lowercased before being placed in the `api_key` query parameter, and
/// `file_type=json` is always appended.
pub struct FredAdapter {
    base_url: String,
    api_key: String,
    registry: EndpointRegistry,
}

impl FredAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut registry = EndpointRegistry::new();
        for ep in ENDPOINTS {
            let requires_series_id = matches!(ep.name, "series" | "series_info");
            let required: Vec<String> = if requires_series_id {
                vec!["series_id".to_string()]
            } else {
                vec![]
            };
            let optional: Vec<String> = ep
                .params
                .iter()
                .map(|p| p.to_string())
                .filter(|p| !required.contains(p))
                .collect();
            registry.register(EndpointDescriptor {
                name: ep.name.to_string(),
                path_template: ep.path.to_string(),
                category: "economics".to_string(),
                tier: Tier::Free,
                description: String::new(),
                required_params: required,
                optional_params: optional,
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

    pub fn is_supported_series(&self, series_id: &str) -> bool {
        let upper = series_id.to_uppercase();
        SERIES.iter().any(|(id, _)| *id == upper)
    }
}

impl ProviderAdapter for FredAdapter {
    fn name(&self) -> &str {
        "fred"
    }

    fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    fn build_url(&self, endpoint: &str, params: &Params) -> Result<String, AdapterError> {
        let config = self.endpoint_config(endpoint)?;
        if matches!(endpoint, "series" | "series_info") {
            require_param(params, endpoint, "series_id")?;
        }
        Ok(format!("{}{}", self.base_url, config.path))
    }

    fn build_query(&self, endpoint: &str, params: &Params) -> Result<BTreeMap<String, String>, AdapterError> {
        let config = self.endpoint_config(endpoint)?;
        let mut query = BTreeMap::new();
        query.insert("api_key".to_string(), self.api_key.to_lowercase());
        query.insert("file_type".to_string(), "json".to_string());
        for name in config.params {
            if let Some(value) = params.get(*name).and_then(crate::param_to_string) {
                query.insert((*name).to_string(), value);
            }
        }
        Ok(query)
    }

    fn normalize(&self, raw: &JsonValue, endpoint: &str) -> JsonValue {
        if let Some(code) = raw.get("error_code") {
            return serde_json::json!({
                "error": raw.get("error_message").cloned().unwrap_or(JsonValue::String("Unknown error".into())),
                "error_code": code,
                "data": JsonValue::Null,
            });
        }

        match endpoint {
            "series" => {
                if raw.is_object() {
                    serde_json::json!({
                        "realtime_start": raw.get("realtime_start"),
                        "realtime_end": raw.get("realtime_end"),
                        "observation_start": raw.get("observation_start"),
                        "observation_end": raw.get("observation_end"),
                        "units": raw.get("units"),
                        "output_type": raw.get("output_type"),
                        "order_by": raw.get("order_by"),
                        "sort_order": raw.get("sort_order"),
                        "count": raw.get("count").cloned().unwrap_or(JsonValue::from(0)),
                        "observations": raw.get("observations").cloned().unwrap_or(JsonValue::Array(vec![])),
                    })
                } else {
                    raw.clone()
                }
            }
            "series_info" => {
                if let Some(seriess) = raw.get("seriess").and_then(JsonValue::as_array) {
                    if seriess.len() == 1 {
                        return seriess[0].clone();
                    }
                    return serde_json::json!({ "seriess": seriess });
                }
                raw.clone()
            }
            "releases" => {
                if raw.is_object() {
                    serde_json::json!({
                        "releases": raw.get("releases").cloned().unwrap_or(JsonValue::Array(vec![])),
                        "count": raw.get("count").cloned().unwrap_or(JsonValue::from(0)),
                    })
                } else {
                    raw.clone()
                }
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
    fn api_key_is_lowercased_and_file_type_is_always_appended() {
        let adapter = FredAdapter::new("https://api.stlouisfed.org/fred", "ABC123");
        let query = adapter
            .build_query("series", &params(&[("series_id", "CPIAUCSL")]))
            .unwrap();
        assert_eq!(query.get("api_key"), Some(&"abc123".to_string()));
        assert_eq!(query.get("file_type"), Some(&"json".to_string()));
    }

    #[test]
    fn series_endpoint_requires_series_id() {
        let adapter = FredAdapter::new("https://api.stlouisfed.org/fred", "key");
        let err = adapter.build_url("series", &Params::new()).unwrap_err();
        assert_eq!(
            err,
            AdapterError::MissingParam {
                endpoint: "series".to_string(),
                param: "series_id".to_string(),
            }
        );
    }

    #[test]
    fn normalize_unwraps_single_series_info_result() {
        let adapter = FredAdapter::new("https://api.stlouisfed.org/fred", "key");
        let raw = serde_json::json!({"seriess": [{"id": "CPIAUCSL"}]});
        let normalized = adapter.normalize(&raw, "series_info");
        assert_eq!(normalized["id"], "CPIAUCSL");
    }

    #[test]
    fn recognizes_seed_series_catalog() {
        let adapter = FredAdapter::new("https://api.stlouisfed.org/fred", "key");
        assert!(adapter.is_supported_series("cpiaucsl"));
        assert!(!adapter.is_supported_series("NOT_A_SERIES"));
    }

    #[test]
    fn releases_endpoint_does_not_require_series_id() {
        let adapter = FredAdapter::new("https://api.stlouisfed.org/fred", "key");
        assert!(adapter.build_url("releases", &Params::new()).is_ok());
    }
}
