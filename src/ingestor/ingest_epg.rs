use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::errors::SourceError;
use crate::models::EpgSource;
use crate::utils::decompression;
use crate::utils::xmltv_parser::{parse_xmltv, ParsedGuide};

/// Fetches and parses individual XMLTV sources.
///
/// Every failure is per-source: the merge layer decides what a failed source
/// means for the run.
pub struct EpgIngestor {
    client: Client,
}

impl EpgIngestor {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch, decompress and parse one EPG source
    pub async fn ingest_source(&self, source: &EpgSource) -> Result<ParsedGuide, SourceError> {
        info!("Fetching XMLTV data from: {}", source.url);

        let body = self.fetch_source(source).await?;
        info!(
            "Downloaded XMLTV content for '{}' ({} bytes)",
            source.name,
            body.len()
        );

        let body = decompression::decompress(body)
            .map_err(|e| SourceError::parse(&source.name, e.to_string()))?;

        let content = String::from_utf8_lossy(&body);
        let guide = parse_xmltv(&content, &source.name)?;

        if guide.skipped_elements > 0 {
            warn!(
                "Source '{}': skipped {} malformed elements",
                source.name, guide.skipped_elements
            );
        }
        info!(
            "Parsed source '{}': {} channels, {} programmes",
            source.name,
            guide.channels.len(),
            guide.programs.len()
        );

        Ok(guide)
    }

    /// HTTP GET with the configured timeout; non-2xx statuses are errors
    async fn fetch_source(&self, source: &EpgSource) -> Result<Vec<u8>, SourceError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| Self::transport_error(&source.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http(status.as_u16(), &source.url));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&source.url, e))?;

        Ok(body.to_vec())
    }

    fn transport_error(url: &str, error: reqwest::Error) -> SourceError {
        if error.is_timeout() {
            SourceError::timeout(url)
        } else {
            SourceError::unavailable(url, error.to_string())
        }
    }
}
