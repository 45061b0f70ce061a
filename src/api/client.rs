//! HTTP client for the resource service.
//!
//! This module provides the `reqwest`-backed [`RequestExecutor`].

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ApiError, Result, SeedbedError};

use super::transport::{ApiRequest, RequestExecutor};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on a `Retry-After` delay honored between attempts.
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// Resource service API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client.
    client: Client,
    /// Base URL without a trailing slash.
    base_url: String,
    /// API key.
    api_key: String,
    /// Base delay between retries.
    retry_delay: Duration,
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("seedbed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Sets the base delay between retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Executes a request, retrying transient failures.
    async fn execute(&self, request: &ApiRequest) -> Result<Value> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if let Some(previous) = &last_error {
                let delay = self.backoff(attempt, previous);
                debug!("Retry attempt {attempt} of {MAX_RETRIES} for {request} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.execute_once(request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SeedbedError::Api(ApiError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    /// Returns the wait before `attempt`: linear in the attempt number, and
    /// never shorter than the service's `Retry-After` (capped).
    fn backoff(&self, attempt: u32, error: &SeedbedError) -> Duration {
        let linear = self.retry_delay * attempt;
        error.retry_delay_secs().map_or(linear, |secs| {
            linear.max(Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
        })
    }

    /// Executes a single request.
    async fn execute_once(&self, request: &ApiRequest) -> Result<Value> {
        trace!("Executing {request}");

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::ACCEPT, "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            SeedbedError::Api(ApiError::NetworkError {
                message: format!("Request failed: {e}"),
            })
        })?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(SeedbedError::Api(ApiError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SeedbedError::Api(ApiError::AuthenticationFailed {
                message: format!("Service rejected credentials ({status})"),
            }));
        }

        let text = response.text().await.map_err(|e| {
            SeedbedError::Api(ApiError::InvalidResponse {
                message: format!("Failed to read response body: {e}"),
            })
        })?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text).into());
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            SeedbedError::Api(ApiError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
        })
    }
}

#[async_trait]
impl RequestExecutor for ApiClient {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.execute(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), "test-key")
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_post_sends_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nilocation/v1/locations"))
            .and(header_is("authorization", "Bearer test-key"))
            .and(body_json(json!({ "name": "Lab" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "loc-1" })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .send(ApiRequest::post("/nilocation/v1/locations", json!({ "name": "Lab" })))
            .await
            .unwrap();

        assert_eq!(response, json!({ "id": "loc-1" }));
    }

    #[tokio::test]
    async fn test_query_parameters_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/things"))
            .and(query_param("workspace", "ws-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .send(ApiRequest::get("/things").with_query("workspace", "ws-1"))
            .await
            .unwrap();

        assert_eq!(response, json!([]));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .send(ApiRequest::delete("/things/1"))
            .await
            .unwrap();

        assert_eq!(response, Value::Null);
    }

    #[tokio::test]
    async fn test_conflict_carries_parsed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": { "message": "A location named Lab already exists", "resourceId": "loc-7" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .send(ApiRequest::post("/things", json!({})))
            .await
            .unwrap_err();

        let api = err.as_api().unwrap();
        assert!(api.is_conflict());
        assert_eq!(api.body().unwrap()["error"]["resourceId"], "loc-7");
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .send(ApiRequest::get("/things"))
            .await
            .unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .with_priority(2)
            .mount(&server)
            .await;

        let response = client(&server)
            .await
            .send(ApiRequest::get("/things"))
            .await
            .unwrap();

        assert_eq!(response, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_rate_limit_waits_for_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .with_priority(2)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let response = client(&server)
            .await
            .send(ApiRequest::get("/things"))
            .await
            .unwrap();

        assert_eq!(response, json!({ "ok": true }));
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_backoff_caps_retry_after() {
        let server = MockServer::start().await;
        let client = client(&server).await;

        let limited = SeedbedError::from(ApiError::RateLimited { retry_after_secs: 3600 });
        assert_eq!(client.backoff(1, &limited), Duration::from_secs(MAX_RETRY_AFTER_SECS));

        let network = SeedbedError::from(ApiError::network("reset"));
        assert_eq!(client.backoff(2, &network), Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .send(ApiRequest::post("/things", json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.as_api().and_then(ApiError::status), Some(500));
    }

    #[tokio::test]
    async fn test_non_json_success_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .send(ApiRequest::get("/things"))
            .await
            .unwrap_err();

        assert!(matches!(err, SeedbedError::Api(ApiError::InvalidResponse { .. })));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://service.example/", "k").unwrap();
        assert_eq!(client.base_url(), "https://service.example");
    }
}
