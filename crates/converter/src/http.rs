//! HTTP utilities
//!
//! The pipeline only needs "GET a URL into memory", so the transport sits
//! behind [`AssetFetcher`] and the reqwest-backed [`HttpFetcher`] is the
//! default implementation.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::config::ConvertConfig;
use crate::error::{ConvertError, FetchError, Result};

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Trait for the transport used to fetch catalog metadata and files
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// GET `url`; any non-2xx status is an error
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedAsset, FetchError>;
}

/// reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HTTP client from conversion configuration
    pub fn from_config(config: &ConvertConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder
            .build()
            .map_err(|source| ConvertError::HttpClient { source })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedAsset, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(FetchedAsset { bytes, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertConfigBuilder;
    use std::time::Duration;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn fetch_returns_body_and_content_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pack.mrpack"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"PK-data".to_vec())
                    .insert_header("content-type", "application/zip"),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::from_config(&ConvertConfig::default()).unwrap();
        let asset = fetcher
            .fetch(&format!("{}/pack.mrpack", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(&asset.bytes[..], b"PK-data");
        assert_eq!(asset.content_type.as_deref(), Some("application/zip"));
    }

    #[tokio::test]
    async fn slow_body_completes_without_deadline() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 16])
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&mock_server)
            .await;

        let url = format!("{}/big.jar", mock_server.uri());

        let unbounded = HttpFetcher::from_config(&ConvertConfig::default()).unwrap();
        assert_eq!(unbounded.fetch(&url).await.unwrap().bytes.len(), 16);

        let config = ConvertConfigBuilder::new()
            .timeout(Some(Duration::from_millis(200)))
            .build();
        let bounded = HttpFetcher::from_config(&config).unwrap();
        assert!(matches!(bounded.fetch(&url).await, Err(FetchError::Request { .. })));
    }

    #[tokio::test]
    async fn fetch_maps_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::from_config(&ConvertConfig::default()).unwrap();
        let url = format!("{}/missing.jar", mock_server.uri());

        match fetcher.fetch(&url).await {
            Err(FetchError::Status { status, url: failed }) => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert_eq!(failed, url);
            }
            other => panic!("Expected Status error, got {:?}", other),
        }
    }
}
