//! Outbound HTTP calls to other services.
//!
//! Every cross-service call goes through [`OutboundCall`], so policies such
//! as retry or backoff can wrap it without the collaborators changing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

/// Errors from calling another service.
#[derive(Debug, Clone, Error)]
pub enum DependencyError {
    /// The request could not be sent or the connection failed.
    #[error("{service} unreachable: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The service did not answer within the client timeout.
    #[error("{service} timed out after {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },

    /// The service answered with an unexpected status.
    #[error("{service} responded with status {status}")]
    Status { service: &'static str, status: u16 },

    /// The response body did not have the expected shape.
    #[error("{service} returned an unexpected body: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

/// A JSON request to another service.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// Name of the target service, used in errors and logs.
    pub service: &'static str,
    pub method: Method,
    pub url: String,
    pub body: Value,
}

/// The answer of another service. Non-JSON bodies are kept as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundResponse {
    pub status: u16,
    pub body: Value,
}

impl OutboundResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the `error` message of an error body, if present.
    pub fn error_message(&self) -> Option<&str> {
        match &self.body {
            Value::Object(map) => map.get("error").and_then(Value::as_str),
            Value::String(text) if !text.trim().is_empty() => Some(text.trim()),
            _ => None,
        }
    }
}

/// Performs a single outbound call. Implementations must bound the call
/// with a timeout.
#[async_trait]
pub trait OutboundCall: Send + Sync {
    async fn call(&self, request: OutboundRequest) -> Result<OutboundResponse, DependencyError>;
}

/// [`OutboundCall`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestCaller {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestCaller {
    /// Creates a caller whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl OutboundCall for ReqwestCaller {
    #[tracing::instrument(skip(self, request), fields(service = request.service, url = %request.url))]
    async fn call(&self, request: OutboundRequest) -> Result<OutboundResponse, DependencyError> {
        let service = request.service;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                DependencyError::Timeout {
                    service,
                    after: self.timeout,
                }
            } else {
                DependencyError::Transport {
                    service,
                    message: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .request(request.method, &request.url)
            .json(&request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(status, "outbound call answered");
        Ok(OutboundResponse { status, body })
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    requests: Vec<OutboundRequest>,
    scripted: HashMap<&'static str, Result<OutboundResponse, DependencyError>>,
}

/// [`OutboundCall`] that records requests and answers from a script.
///
/// Services without a scripted answer respond `200 {}`.
#[derive(Debug, Clone, Default)]
pub struct RecordingCaller {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every call to `service` with the given status and body.
    pub fn respond(&self, service: &'static str, status: u16, body: Value) {
        self.state
            .write()
            .unwrap()
            .scripted
            .insert(service, Ok(OutboundResponse::new(status, body)));
    }

    /// Fails every call to `service` with the given error.
    pub fn fail(&self, service: &'static str, error: DependencyError) {
        self.state
            .write()
            .unwrap()
            .scripted
            .insert(service, Err(error));
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.state.read().unwrap().requests.clone()
    }
}

#[async_trait]
impl OutboundCall for RecordingCaller {
    async fn call(&self, request: OutboundRequest) -> Result<OutboundResponse, DependencyError> {
        let mut state = self.state.write().unwrap();
        let answer = state
            .scripted
            .get(request.service)
            .cloned()
            .unwrap_or_else(|| Ok(OutboundResponse::new(200, serde_json::json!({}))));
        state.requests.push(request);
        answer
    }
}
