//! Pluggable request transport.
//!
//! The session manager never talks to the network directly; it hands fully
//! formed requests to a [`Transport`]. The default implementation rides on
//! `reqwest`, and tests substitute in-process transports.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(String),
    #[error("invalid request target: {0}")]
    Target(String),
}

/// A request as the session manager hands it to the transport. The body is
/// already in its final wire shape.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// Default transport over a shared `reqwest` client and a base URL.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            base,
        }
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        HttpTransport { client, base }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let url = self
            .base
            .join(&request.path)
            .map_err(|err| TransportError::Target(err.to_string()))?;

        let mut builder = self.client.request(request.method, url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(WireResponse { status, body })
    }
}
