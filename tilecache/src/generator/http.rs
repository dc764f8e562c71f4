//! HTTP client abstraction for testability

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};

use crate::cache::BoxFuture;

use super::GeneratorError;

/// Media type requested from the upstream tile server.
pub const MVT_ACCEPT: &str = "application/vnd.mapbox-vector-tile";

/// Status and body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Trait for HTTP client operations.
///
/// Lets the proxy generator run against a mock client in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// Transport failures and timeouts are errors; any received status,
    /// including error statuses, is returned as a response.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, GeneratorError>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Creates a client that asks for gzip-encoded vector tiles and bounds
    /// every request by `timeout`.
    ///
    /// Bodies are returned as received; no transparent decompression.
    pub fn with_timeout(timeout: Duration) -> Result<Self, GeneratorError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(MVT_ACCEPT));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                GeneratorError::Upstream(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }
}

impl HttpClient for ReqwestClient {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<HttpResponse, GeneratorError>> {
        Box::pin(async move {
            let map_err = |e: reqwest::Error| {
                if e.is_timeout() {
                    GeneratorError::Timeout(self.timeout)
                } else {
                    GeneratorError::Upstream(format!("Request to {} failed: {}", url, e))
                }
            };

            let response = self.client.get(url).send().await.map_err(map_err)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(map_err)?;

            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            })
        })
    }
}
