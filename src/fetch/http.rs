//! HTTP tile fetcher backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use crate::error::{ConfigError, FetchError};
use crate::tile::TileKey;

use super::TileFetcher;

/// World Imagery tile endpoint. `{z}` is the zoom, `{y}` the row and `{x}`
/// the column.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://server.arcgisonline.com/arcgis/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}.JPEG";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Some tile servers reject requests without a User-Agent.
const USER_AGENT: &str = concat!("tilemap-viewer/", env!("CARGO_PKG_VERSION"));

/// Fetches tiles over HTTP(S) from a `{z}/{y}/{x}` URL template.
#[derive(Clone)]
pub struct HttpTileFetcher {
    client: reqwest::Client,
    template: String,
}

impl HttpTileFetcher {
    /// Create a fetcher for `template` with the default timeout.
    pub fn new(template: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_timeout(template, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(template: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let template = template.into();
        validate_template(&template)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expand the template for one tile.
    pub fn url_for(&self, key: &TileKey) -> String {
        self.template
            .replace("{z}", &key.zoom.to_string())
            .replace("{y}", &key.row.to_string())
            .replace("{x}", &key.col.to_string())
    }
}

/// A template must name all three coordinates.
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    if ["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p)) {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrlTemplate(template.to_string()))
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
        let url = self.url_for(key);
        trace!(key = %key, url = %url, "GET tile");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(format!("Failed to read response: {}", e)))
    }
}
