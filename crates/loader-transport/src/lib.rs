//! HTTP transport (C1).
//!
//! Wraps a shared `reqwest::Client` and turns every non-2xx response, plus
//! every `reqwest` failure mode, into a [`TransportError`] before it reaches
//! a caller. A [`Response`] value is only ever produced for a 2xx status.

use loader_core::{ErrorKind, JsonValue, TransportError};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A successful (2xx) HTTP response, normalized: the body is decoded as
/// JSON when the content type says so, otherwise carried as a JSON string.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub data: JsonValue,
    pub headers: BTreeMap<String, String>,
    pub url: String,
    pub elapsed_ms: f64,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpTransport {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            default_timeout,
        }
    }

    /// Builds a transport around a caller-supplied client, e.g. one
    /// preconfigured with a connection pool or proxy settings.
    pub fn with_client(client: reqwest::Client, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn perform(
        &self,
        method: HttpMethod,
        url: &str,
        query: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
        body: Option<&JsonValue>,
        timeout: Option<Duration>,
    ) -> Result<Response, TransportError> {
        let effective_timeout = timeout.unwrap_or(self.default_timeout);

        let mut request = self
            .client
            .request(method.to_reqwest(), url)
            .timeout(effective_timeout)
            .query(query);

        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let start = Instant::now();
        let response = request.send().await.map_err(|err| classify_send_error(&err, effective_timeout))?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let response_headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let retry_after = response_headers
            .get("retry-after")
            .and_then(|v| v.parse::<u64>().ok());

        let content_type_is_json = response_headers
            .get("content-type")
            .map(|v| v.contains("application/json"))
            .unwrap_or(false);

        let body_text = response
            .text()
            .await
            .map_err(|err| TransportError::Other(err.to_string()))?;

        let data = if content_type_is_json {
            serde_json::from_str(&body_text).unwrap_or(JsonValue::String(body_text.clone()))
        } else {
            JsonValue::String(body_text)
        };

        tracing::debug!(url = %final_url, status, elapsed_ms, "http response received");

        if (200..300).contains(&status) {
            return Ok(Response {
                status,
                data,
                headers: response_headers,
                url: final_url,
                elapsed_ms,
            });
        }

        if status == 429 {
            return Err(TransportError::RateLimit { retry_after });
        }
        if (500..600).contains(&status) {
            return Err(TransportError::Server { status });
        }
        Err(TransportError::Client { status })
    }
}

fn classify_send_error(err: &reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Whether a kind carried by a [`TransportError`] should count as a breaker
/// failure. Re-exported for callers that only have the kind, not the error.
pub fn counts_as_failure(kind: ErrorKind) -> bool {
    !matches!(kind, ErrorKind::ClientError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn transport() -> (HttpTransport, MockServer) {
        (HttpTransport::new(Duration::from_secs(5)), MockServer::start().await)
    }

    #[tokio::test]
    async fn success_returns_parsed_json() {
        let (transport, server) = transport().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"price": 1.5})))
            .mount(&server)
            .await;

        let response = transport
            .perform(
                HttpMethod::Get,
                &format!("{}/quote", server.uri()),
                &BTreeMap::new(),
                &BTreeMap::new(),
                None,
                None,
            )
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.data["price"], 1.5);
    }

    #[tokio::test]
    async fn rate_limit_status_becomes_rate_limit_error() {
        let (transport, server) = transport().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let err = transport
            .perform(
                HttpMethod::Get,
                &format!("{}/quote", server.uri()),
                &BTreeMap::new(),
                &BTreeMap::new(),
                None,
                None,
            )
            .await
            .unwrap_err();

        match err {
            TransportError::RateLimit { retry_after } => assert_eq!(retry_after, Some(30)),
            other => panic!("expected RateLimit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_status_becomes_server_error() {
        let (transport, server) = transport().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport
            .perform(
                HttpMethod::Get,
                &format!("{}/quote", server.uri()),
                &BTreeMap::new(),
                &BTreeMap::new(),
                None,
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }

    #[tokio::test]
    async fn client_error_status_becomes_client_error() {
        let (transport, server) = transport().await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = transport
            .perform(
                HttpMethod::Get,
                &format!("{}/quote", server.uri()),
                &BTreeMap::new(),
                &BTreeMap::new(),
                None,
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.kind(), ErrorKind::ClientError);
    }
}
