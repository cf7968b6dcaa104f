//! Outbound HTTP transport shared by the catalog clients.

use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Status and body of a catalog response, before any decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Issues one request and hands back the raw response
///
/// Implementations must not retry; a transport error is returned only when
/// no response was received at all.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with the given query parameters
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse>;

    /// POST a JSON body to `url`
    async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(CatalogError::Http)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse> {
        debug!(url = %url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_creation() {
        let transport = HttpTransport::new(Duration::from_secs(5), "maaboo-test/0.1.0");
        assert!(transport.is_ok());
    }

    #[test]
    fn test_raw_response() {
        let response = RawResponse::new(404, "missing");
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "missing");
    }
}
