//! Company news gathering through the search collaborator

use crate::api::{CompanyInfo, SearchProvider};
use crate::context::MarketIntelligence;
use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Runs the fixed set of company news queries and merges their hits
pub struct NewsResearcher {
    search: Arc<dyn SearchProvider>,
    results_per_query: usize,
}

impl NewsResearcher {
    pub fn new(search: Arc<dyn SearchProvider>, results_per_query: usize) -> Self {
        Self {
            search,
            results_per_query,
        }
    }

    /// General news, financial results, strategy and management outlook
    pub fn queries(company: &CompanyInfo) -> Vec<String> {
        let name = &company.name;
        let symbol = &company.symbol;
        vec![
            format!("{name} {symbol} news Vietnam"),
            format!("{name} financial results earnings Vietnam"),
            format!("{name} future plans strategy Vietnam"),
            format!("{name} CEO management outlook Vietnam"),
        ]
    }

    /// Search every query in order, keeping the first hit for each URL
    ///
    /// A failing query fails the whole gathering.
    #[instrument(skip(self, company), fields(symbol = %company.symbol, provider = self.search.name()))]
    pub async fn gather(&self, company: &CompanyInfo) -> Result<MarketIntelligence> {
        let queries = Self::queries(company);
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for query in &queries {
            let hits = self.search.search(query, self.results_per_query).await?;
            debug!(query = %query, hits = hits.len(), "Search returned");
            results.extend(hits.into_iter().filter(|hit| seen.insert(hit.url.clone())));
        }

        info!(queries = queries.len(), results = results.len(), "News gathered");
        Ok(MarketIntelligence { queries, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SearchResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns the same two hits for every query
    struct RepeatingSearch {
        counts: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SearchProvider for RepeatingSearch {
        async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
            self.counts.lock().unwrap().push(count);
            Ok(vec![
                SearchResult {
                    title: "REE annual meeting".into(),
                    url: "https://example.vn/ree-agm".into(),
                    description: String::new(),
                    age: None,
                },
                SearchResult {
                    title: query.to_string(),
                    url: format!("https://example.vn/{}", query.len()),
                    description: String::new(),
                    age: None,
                },
            ])
        }

        fn name(&self) -> &str {
            "repeating"
        }
    }

    fn ree() -> CompanyInfo {
        CompanyInfo {
            symbol: "REE".into(),
            name: "REE Corporation".into(),
            industry: "Industrials".into(),
        }
    }

    #[test]
    fn test_queries() {
        let queries = NewsResearcher::queries(&ree());
        assert_eq!(queries.len(), 4);
        assert_eq!(queries[0], "REE Corporation REE news Vietnam");
        assert_eq!(queries[3], "REE Corporation CEO management outlook Vietnam");
    }

    #[tokio::test]
    async fn test_gather_dedups_by_url() {
        let search = Arc::new(RepeatingSearch {
            counts: Mutex::new(Vec::new()),
        });
        let researcher = NewsResearcher::new(search.clone(), 3);

        let intelligence = researcher.gather(&ree()).await.unwrap();

        assert_eq!(intelligence.queries.len(), 4);
        let agm = intelligence
            .results
            .iter()
            .filter(|r| r.url == "https://example.vn/ree-agm")
            .count();
        assert_eq!(agm, 1);
        assert_eq!(intelligence.results[0].title, "REE annual meeting");
        assert_eq!(*search.counts.lock().unwrap(), vec![3, 3, 3, 3]);
    }
}
