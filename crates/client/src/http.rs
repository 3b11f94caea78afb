//! HTTP client for the claim records API.

use fra_atlas_core::{AtlasConfig, AtlasError, ClaimRecord, Result, SearchParams};
use reqwest::Client;
use tracing::debug;

use crate::source::{decode_claims, ClaimSource};

/// Claim source backed by the records API over HTTP.
#[derive(Clone)]
pub struct HttpClaimSource {
    client: Client,
    base_url: String,
}

impl HttpClaimSource {
    /// Creates a source from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AtlasConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AtlasError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_claims(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<ClaimRecord>> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, params = ?query, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AtlasError::transport(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AtlasError::status(status.as_u16(), body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AtlasError::transport(format!("reading body of {url}: {e}")))?;
        decode_claims(&body)
    }
}

impl ClaimSource for HttpClaimSource {
    async fn fetch_all(&self) -> Result<Vec<ClaimRecord>> {
        self.get_claims("/upload/all", &[]).await
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<ClaimRecord>> {
        self.get_claims("/search", &params.query_pairs()).await
    }
}
