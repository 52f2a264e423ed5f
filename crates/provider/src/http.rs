//! Shared HTTP transport for the backends.
//!
//! `HttpTransport` wraps a `reqwest::Client` with pre-built static headers,
//! the endpoint URL and a request timeout. The bearer credential changes
//! between calls, so it is attached per request.

use crate::error::{ProviderError, Result};
use reqwest::{
    Client, Method, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Shared HTTP transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    headers: HeaderMap,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a JSON transport for `endpoint`.
    pub fn new(client: Client, endpoint: &str, timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            client,
            headers,
            endpoint: endpoint.to_owned(),
            timeout,
        }
    }

    /// Add a static header sent with every request.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| ProviderError::Config(format!("invalid header name {name}: {e}")))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| ProviderError::Config(format!("invalid value for {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// POST `body` with bearer `token` and decode the JSON reply.
    pub async fn send(&self, token: &str, body: &impl Serialize) -> Result<Value> {
        if let Ok(body) = serde_json::to_string(body) {
            tracing::trace!("request: {body}");
        }

        let response = self
            .client
            .request(Method::POST, &self.endpoint)
            .headers(self.headers.clone())
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("connection to {} failed: {e}", self.endpoint);
                ProviderError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if status != StatusCode::OK {
            tracing::error!("backend returned {status}: {text}");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get a reference to the static headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
