//! Executes resolved requests through the rate limiter and interprets the
//! responses.
//!
//! # Design
//! The network round-trip sits behind the `Transport` trait. The dispatcher
//! only sees `HttpRequest`/`HttpResponse` values, so interpretation
//! (`interpret`) is a pure function of the verb and the response. Transport
//! failures are logged here and surface as `ApiError::Generic`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::limiter::RateLimiter;
use crate::types::ErrorEnvelope;

/// Failures below the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connection(_))
    }
}

/// Performs one HTTP round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else if e.is_connect() {
                TransportError::Connection(e.to_string())
            } else {
                TransportError::Other(e.to_string())
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(map_err)?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Successful outcome of a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    /// DELETE calls, and successes whose body is not JSON.
    Status(u16),
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Status(_) => None,
        }
    }

    /// Decode a JSON body into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            ApiResponse::Json(value) => serde_json::from_value(value).map_err(|e| {
                warn!(error = %e, "response body did not match the expected type");
                ApiError::Generic { retryable: false }
            }),
            ApiResponse::Status(status) => {
                warn!(status, "expected a JSON body, got a bare status");
                Err(ApiError::Generic { retryable: false })
            }
        }
    }
}

const RETRY_AFTER: &str = "Retry-After";

/// Map a response to the caller-visible outcome.
pub fn interpret(method: HttpMethod, response: HttpResponse) -> Result<ApiResponse> {
    if response.is_success() {
        if method == HttpMethod::Delete {
            return Ok(ApiResponse::Status(response.status));
        }
        return Ok(serde_json::from_str(&response.body)
            .map(ApiResponse::Json)
            .unwrap_or(ApiResponse::Status(response.status)));
    }

    match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => {
            let err = classify(response.status, envelope.message);
            if let ApiError::RateLimit(details) = &err {
                warn!(
                    code = details.code,
                    request = ?details.request,
                    retry_after = ?response.header(RETRY_AFTER),
                    "rate limited by remote API"
                );
            }
            Err(err)
        }
        Err(e) => {
            warn!(status = response.status, error = %e, "unreadable error payload");
            Err(ApiError::Generic { retryable: false })
        }
    }
}

/// Sends resolved requests through a shared `RateLimiter`.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").field("limiter", &self.limiter).finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>) -> Self {
        Self { transport, limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Raw round-trip through the limiter, without interpretation.
    pub async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        self.limiter.schedule(|| self.transport.execute(request)).await
    }

    pub async fn dispatch(&self, request: HttpRequest) -> Result<ApiResponse> {
        debug!(method = %request.method, url = %request.url, "dispatching");
        match self.send(&request).await {
            Ok(response) => {
                debug!(status = response.status, url = %request.url, "response received");
                interpret(request.method, response)
            }
            Err(e) => {
                warn!(error = %e, url = %request.url, "request failed");
                Err(ApiError::Generic {
                    retryable: e.is_retryable(),
                })
            }
        }
    }
}
