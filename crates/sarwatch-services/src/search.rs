//! Granule search client
//!
//! Talks to the ASF search API. Every call returns the `jsonlite` result
//! list; HTTP 4xx responses are terminal, 5xx responses and transport
//! failures are transient.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use sarwatch_core::models::timestamp;
use sarwatch_core::{AppError, Event, SearchConfig, SearchGranule};

const OUTPUT_FORMAT: &str = "jsonlite";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request rejected ({status}): {body}")]
    Client { status: u16, body: String },

    #[error("search service error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected search response: {0}")]
    Decode(String),
}

impl SearchError {
    /// Transient failures are retried by the next run.
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Server { .. } | SearchError::Transport(_))
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

/// Spatial and temporal search criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub intersects_with: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl SearchParams {
    pub fn for_event(event: &Event) -> Self {
        Self {
            intersects_with: event.wkt.clone(),
            start: event.processing_timeframe.start,
            end: event.processing_timeframe.end,
        }
    }
}

/// One entry of a granule's baseline stack.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StackEntry {
    #[serde(rename = "productID", alias = "fileID")]
    pub product_id: String,
    /// Days relative to the reference granule; negative means earlier.
    #[serde(rename = "temporalBaseline", default)]
    pub temporal_baseline: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    results: Vec<T>,
}

#[async_trait]
pub trait GranuleSearch: Send + Sync {
    /// Granules matching the search criteria, in service order.
    async fn search(&self, params: &SearchParams) -> Result<Vec<SearchGranule>, SearchError>;

    /// The baseline stack of a reference granule.
    async fn baseline_stack(&self, granule_name: &str) -> Result<Vec<StackEntry>, SearchError>;

    /// Re-query a batch of granules by product id.
    async fn product_list(&self, product_ids: &[String]) -> Result<Vec<SearchGranule>, SearchError>;
}

/// ASF search API client
pub struct AsfSearchClient {
    http_client: reqwest::Client,
    search_url: String,
    baseline_url: String,
    beam_mode: String,
    platform: String,
    processing_level: String,
}

impl AsfSearchClient {
    pub fn new(config: &SearchConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("sarwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client for granule search")?;

        Ok(Self {
            http_client,
            search_url: config.search_url.clone(),
            baseline_url: config.baseline_url.clone(),
            beam_mode: config.beam_mode.clone(),
            platform: config.platform.clone(),
            processing_level: config.processing_level.clone(),
        })
    }

    fn search_query(&self, params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(7);
        if let Some(wkt) = &params.intersects_with {
            query.push(("intersectsWith", wkt.clone()));
        }
        query.push(("start", timestamp::format(&params.start)));
        if let Some(end) = &params.end {
            query.push(("end", timestamp::format(end)));
        }
        query.push(("beamMode", self.beam_mode.clone()));
        query.push(("platform", self.platform.clone()));
        query.push(("processingLevel", self.processing_level.clone()));
        query.push(("output", OUTPUT_FORMAT.to_string()));
        query
    }
}

async fn read_results<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Vec<T>, SearchError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_client_error() {
        return Err(SearchError::Client {
            status: status.as_u16(),
            body,
        });
    }
    if !status.is_success() {
        return Err(SearchError::Server {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: SearchResponse<T> =
        serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))?;
    Ok(parsed.results)
}

#[async_trait]
impl GranuleSearch for AsfSearchClient {
    async fn search(&self, params: &SearchParams) -> Result<Vec<SearchGranule>, SearchError> {
        let start = std::time::Instant::now();
        let response = self
            .http_client
            .get(&self.search_url)
            .query(&self.search_query(params))
            .send()
            .await?;

        let results = read_results(response).await?;
        tracing::info!(
            count = results.len(),
            duration_ms = start.elapsed().as_millis(),
            "Granule search completed"
        );
        Ok(results)
    }

    async fn baseline_stack(&self, granule_name: &str) -> Result<Vec<StackEntry>, SearchError> {
        let response = self
            .http_client
            .get(&self.baseline_url)
            .query(&[("reference", granule_name), ("output", OUTPUT_FORMAT)])
            .send()
            .await?;

        let stack: Vec<StackEntry> = read_results(response).await?;
        tracing::debug!(granule = %granule_name, stack_size = stack.len(), "Baseline stack fetched");
        Ok(stack)
    }

    async fn product_list(&self, product_ids: &[String]) -> Result<Vec<SearchGranule>, SearchError> {
        let response = self
            .http_client
            .post(&self.search_url)
            .query(&[
                ("product_list", product_ids.join(",")),
                ("output", OUTPUT_FORMAT.to_string()),
            ])
            .send()
            .await?;

        read_results(response).await
    }
}
