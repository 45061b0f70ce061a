//! Test doubles shared by unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::api::{ApiRequest, RequestExecutor};
use crate::config::{Document, DocumentLoader};
use crate::error::{ApiError, Result, SeedbedError};

/// Parses and validates an inline YAML document.
pub fn document(yaml: &str) -> Document {
    DocumentLoader::new(".").parse_str(yaml, "inline").unwrap().0
}

/// Location, then a system in it, then an asset in that system.
pub fn chain_document() -> Document {
    document(
        r#"
format_version: "1.0"
name: chain
title: Chain
resources:
  - type: location
    name: Lab
    id_reference: lab
    tags: [site]
    properties:
      description: Main lab
  - type: system
    name: Bench
    id_reference: bench
    tags: [hardware]
    properties:
      location_id: "${lab}"
  - type: asset
    name: Scope
    id_reference: scope
    tags: [hardware]
    properties:
      location:
        minionId: "${bench}"
"#,
    )
}

/// A canned service reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// 2xx with a JSON body.
    Json(Value),
    /// Non-success status with a JSON body (`Null` for an empty body).
    Status(u16, Value),
    /// Transport failure.
    Network(String),
    /// Rejected credentials.
    Unauthorized,
}

impl Reply {
    fn into_result(self) -> Result<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Status(status, body) => {
                let text = if body.is_null() { String::new() } else { body.to_string() };
                Err(ApiError::from_response(status, &text).into())
            }
            Self::Network(message) => Err(ApiError::network(message).into()),
            Self::Unauthorized => Err(SeedbedError::Api(ApiError::AuthenticationFailed {
                message: String::from("bad key"),
            })),
        }
    }
}

/// Records every request and answers from per-route queues.
///
/// Routes are keyed by `"METHOD path"`. Queued replies are used once, in
/// order; a route with no queued reply falls back to its standing reply,
/// and then to an empty `200` (`Value::Null`).
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    requests: Mutex<Vec<ApiRequest>>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    standing: Mutex<HashMap<String, Reply>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot reply for a route.
    pub fn reply(&self, method: &str, path: &str, reply: Reply) -> &Self {
        self.queued
            .lock()
            .unwrap()
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(reply);
        self
    }

    /// Sets the reply used whenever a route's queue is empty.
    pub fn always(&self, method: &str, path: &str, reply: Reply) -> &Self {
        self.standing
            .lock()
            .unwrap()
            .insert(format!("{method} {path}"), reply);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns the requests sent with a given method, in order.
    pub fn requests_with(&self, method: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.as_str() == method)
            .collect()
    }
}

#[async_trait]
impl RequestExecutor for RecordingExecutor {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let key = request.to_string();
        self.requests.lock().unwrap().push(request);

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        let reply = queued.or_else(|| self.standing.lock().unwrap().get(&key).cloned());

        reply.map_or(Ok(Value::Null), Reply::into_result)
    }
}
