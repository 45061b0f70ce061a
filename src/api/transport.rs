//! The request executor contract.
//!
//! Adapters never talk to `reqwest` directly. They build an [`ApiRequest`]
//! and hand it to a [`RequestExecutor`], which owns credentials, the base
//! URL, and retry policy.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::{Result, SeedbedError};

/// A single request against the resource service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the service base URL, starting with `/`.
    pub path: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request with no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a `POST` request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// Creates a `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

impl std::fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Issues authenticated requests and returns parsed response bodies.
///
/// A successful response yields its JSON body (`Value::Null` when empty).
/// Non-success responses are returned as [`crate::error::ApiError`]s.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Sends one request.
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Executor for runs that must never reach the network.
///
/// Any request is a fatal error, so a dry run that would touch the service
/// aborts instead of silently sending.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineExecutor;

#[async_trait]
impl RequestExecutor for OfflineExecutor {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        Err(SeedbedError::internal(format!(
            "Refusing to send {request}: no service is configured for this run"
        )))
    }
}
