//! Brave web search client

use super::{SearchProvider, SearchResult, SharedRateLimiter};
use crate::error::{AnalystError, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Brave Search API client
///
/// The free plan allows one request per second; the limiter enforces it.
pub struct BraveClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl BraveClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalystError::Configuration("Brave API key is empty".to_string()));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::MIN))),
        })
    }
}

#[async_trait]
impl SearchProvider for BraveClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(SEARCH_URL)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalystError::unavailable(
                query,
                "search",
                format!("Brave API error {status}: {body}"),
            ));
        }

        let parsed: BraveResponse = response.json().await?;
        let results: Vec<SearchResult> = parsed
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(count)
            .collect();
        debug!(results = results.len(), "Search complete");
        Ok(results)
    }

    fn name(&self) -> &str {
        "brave"
    }
}
