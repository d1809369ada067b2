//! HTTP client capability used by the fetch layer
//!
//! The fetch orchestrator only needs one thing from the network: a JSON GET
//! that fails on transport errors and non-2xx statuses. That capability is
//! expressed as the `HttpClient` trait so tests can substitute a scripted
//! client, with `ReqwestClient` as the production implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced by the network transport
#[derive(Debug, Error)]
pub enum HttpError {
    /// The request could not be sent or the response body not read
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not valid JSON
    #[error("failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Capability to GET a URL and return its JSON body
///
/// Query parameters and headers pass through to the transport verbatim; the
/// cache layer never interprets them beyond cache-key derivation.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the parsed JSON response body
    ///
    /// Must fail (rather than return an error body) on transport failure
    /// and on non-2xx statuses, so the fetch layer can decide between
    /// propagating the error and serving stale cache.
    async fn get_json(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
    ) -> Result<Value, HttpError>;
}

/// Production `HttpClient` backed by `reqwest`
///
/// Timeout and retry policy belong to the `reqwest::Client` handed in via
/// `with_client`; this layer adds none of its own.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Create a client with default settings
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a client wrapping a preconfigured `reqwest::Client`
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_json(
        &self,
        url: &str,
        query: &BTreeMap<String, String>,
        headers: &BTreeMap<String, String>,
    ) -> Result<Value, HttpError> {
        let mut request = self.client.get(url);

        if !query.is_empty() {
            request = request.query(query);
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
