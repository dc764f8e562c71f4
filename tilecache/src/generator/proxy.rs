//! Generation by forwarding to an external tile server.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::cache::BoxFuture;
use crate::coord::TileAddress;

use super::encoding::{ensure_gzip, is_gzip};
use super::http::HttpClient;
use super::{GeneratorError, TileGenerator};

/// Generator that fetches `{base_url}/{z}/{x}/{y}` from an upstream server.
///
/// Gzip-encoded bodies pass through unmodified and plain bodies are
/// compressed here, so the payload is always gzip. 204 and 404 mean "no data
/// here" and yield an empty payload; any other non-2xx status is a failure.
pub struct ProxyTileGenerator {
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl ProxyTileGenerator {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Upstream URL for `tile`.
    pub fn tile_url(&self, tile: &TileAddress) -> String {
        format!("{}/{}/{}/{}", self.base_url, tile.zoom(), tile.x(), tile.y())
    }

    async fn fetch(&self, tile: TileAddress) -> Result<Vec<u8>, GeneratorError> {
        let start = Instant::now();
        let url = self.tile_url(&tile);
        let response = self.client.get(&url).await?;

        match response.status {
            204 | 404 => {
                debug!(tile = %tile, status = response.status, "Upstream has no data");
                Ok(Vec::new())
            }
            200..=299 => {
                let upstream_gzip = is_gzip(&response.body);
                let payload = ensure_gzip(response.body)?;
                debug!(
                    tile = %tile,
                    size = payload.len(),
                    upstream_gzip,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream tile fetched"
                );
                Ok(payload)
            }
            status => Err(GeneratorError::Upstream(format!("HTTP {} from {}", status, url))),
        }
    }
}

impl TileGenerator for ProxyTileGenerator {
    fn generate(&self, tile: TileAddress) -> BoxFuture<'_, Result<Vec<u8>, GeneratorError>> {
        Box::pin(self.fetch(tile))
    }

    fn name(&self) -> &'static str {
        "proxy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::http::tests::MockHttpClient;
    use std::time::Duration;

    fn tile() -> TileAddress {
        TileAddress::new(14, 8192, 8191).unwrap()
    }

    #[tokio::test]
    async fn test_forwards_to_upstream_path() {
        let mock = Arc::new(MockHttpClient::ok(200, b"\x1f\x8bpayload"));
        let generator = ProxyTileGenerator::new(mock.clone(), "http://localhost:7800/");

        let bytes = generator.generate(tile()).await.unwrap();

        assert_eq!(bytes, b"\x1f\x8bpayload".to_vec());
        assert_eq!(
            *mock.requests.lock(),
            vec!["http://localhost:7800/14/8192/8191".to_string()]
        );
    }

    #[tokio::test]
    async fn test_uncompressed_upstream_body_is_gzipped() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let raw = b"\x1a\x0b\x0a\x05roads";
        let generator = ProxyTileGenerator::new(Arc::new(MockHttpClient::ok(200, raw)), "http://up");

        let bytes = generator.generate(tile()).await.unwrap();

        assert!(is_gzip(&bytes));
        let mut decoded = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, raw.to_vec());
    }

    #[tokio::test]
    async fn test_no_data_statuses_are_empty() {
        for status in [204, 404] {
            let generator =
                ProxyTileGenerator::new(Arc::new(MockHttpClient::ok(status, b"")), "http://up");
            assert_eq!(generator.generate(tile()).await.unwrap(), Vec::<u8>::new());
        }
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let generator =
            ProxyTileGenerator::new(Arc::new(MockHttpClient::ok(502, b"bad gateway")), "http://up");
        let result = generator.generate(tile()).await;
        assert!(matches!(result, Err(GeneratorError::Upstream(msg)) if msg.contains("502")));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mock = MockHttpClient::new(Err(GeneratorError::Timeout(Duration::from_millis(8000))));
        let generator = ProxyTileGenerator::new(Arc::new(mock), "http://up");

        let result = generator.generate(tile()).await;
        assert_eq!(result, Err(GeneratorError::Timeout(Duration::from_millis(8000))));
    }
}
