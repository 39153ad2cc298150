//! Clients for external collaborators
//!
//! - [`VciClient`]: field catalog, financial statements and company listing
//!   from the Vietcap GraphQL API
//! - [`TcbsClient`]: dividend payment history
//! - [`BraveClient`]: web search snippets for the news task
//!
//! The pipeline only sees the [`StatementSource`] and [`SearchProvider`]
//! traits, so tests swap in canned implementations.

mod brave;
mod tcbs;
mod vci;

pub use brave::BraveClient;
pub use tcbs::TcbsClient;
pub use vci::VciClient;

use crate::config::AnalystConfig;
use crate::error::Result;
use crate::statement::{ColumnNormalizer, RawStatement, StatementKind};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

pub(crate) type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Listed company name and industry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub symbol: String,
    pub name: String,
    pub industry: String,
}

impl CompanyInfo {
    /// Stand-in used when the listing lookup fails: the symbol as name, no
    /// industry
    pub fn fallback(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            industry: String::new(),
        }
    }
}

/// One web search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Publication age as reported by the search engine, e.g. "3 days ago"
    #[serde(default)]
    pub age: Option<String>,
}

/// Source of raw financial statements
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// One statement for `symbol`; fails with `DataUnavailable`
    async fn fetch(&self, symbol: &str, kind: StatementKind) -> Result<RawStatement>;

    /// Company name and industry
    async fn company(&self, symbol: &str) -> Result<CompanyInfo>;

    fn name(&self) -> &str;
}

/// Web search collaborator
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>>;

    fn name(&self) -> &str;
}

/// Vietnamese market data: statements and listings from VCI, dividends from
/// TCBS
pub struct MarketDataSource {
    vci: VciClient,
    tcbs: TcbsClient,
}

impl MarketDataSource {
    pub fn new(vci: VciClient, tcbs: TcbsClient) -> Self {
        Self { vci, tcbs }
    }

    /// Clients configured from `config`; only mapped fields are requested
    pub fn from_config(config: &AnalystConfig, normalizer: ColumnNormalizer) -> Result<Self> {
        Ok(Self::new(
            VciClient::new(config, normalizer)?,
            TcbsClient::new(config.request_timeout)?,
        ))
    }
}

#[async_trait]
impl StatementSource for MarketDataSource {
    async fn fetch(&self, symbol: &str, kind: StatementKind) -> Result<RawStatement> {
        match kind {
            StatementKind::Dividends => self.tcbs.dividends(symbol).await,
            other => self.vci.statement(symbol, other).await,
        }
    }

    async fn company(&self, symbol: &str) -> Result<CompanyInfo> {
        self.vci.company(symbol).await
    }

    fn name(&self) -> &str {
        "vci+tcbs"
    }
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client presenting browser headers to a vendor site
pub(crate) fn browser_client(
    referer: &'static str,
    origin: &'static str,
    timeout: Duration,
) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,vi-VN;q=0.8,vi;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::REFERER, HeaderValue::from_static(referer));
    headers.insert(header::ORIGIN, HeaderValue::from_static(origin));

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// Direct limiter allowing `per_minute` requests
pub(crate) fn per_minute_limiter(per_minute: u32) -> SharedRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

const MAX_ATTEMPTS: u32 = 3;

/// Send a vendor request, retrying throttling and server errors
///
/// 403, 429 and 5xx responses and transport errors are retried with
/// exponential backoff; other client errors fail at once. The error string
/// becomes the `reason` of a `DataUnavailable`.
pub(crate) async fn send_json(
    vendor: &str,
    limiter: &SharedRateLimiter,
    request: impl Fn() -> RequestBuilder,
) -> std::result::Result<serde_json::Value, String> {
    let mut last_error = String::from("no attempt made");

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let backoff = Duration::from_secs(1 << (attempt - 1));
            debug!(vendor, attempt, ?backoff, "Retrying vendor request");
            sleep(backoff).await;
        }
        limiter.until_ready().await;

        let response = match request().send().await {
            Ok(response) => response,
            Err(e) => {
                last_error = format!("request failed: {e}");
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            return response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| format!("invalid JSON from {vendor}: {e}"));
        }

        last_error = format!("{vendor} returned HTTP {status}");
        let retryable = status.as_u16() == 403 || status.as_u16() == 429 || status.is_server_error();
        if !retryable {
            break;
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_fallback() {
        let info = CompanyInfo::fallback("REE");
        assert_eq!(info.name, "REE");
        assert!(info.industry.is_empty());
    }

    #[test]
    fn test_search_result_defaults() {
        let result: SearchResult = serde_json::from_value(serde_json::json!({
            "title": "REE posts record profit",
            "url": "https://example.vn/ree"
        }))
        .unwrap();
        assert!(result.description.is_empty());
        assert_eq!(result.age, None);
    }

    #[tokio::test]
    async fn test_limiter_allows_first_request_immediately() {
        let limiter = per_minute_limiter(0);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
