//! Web search relay — single-shot lookup with deterministic fallback.
//!
//! Forwards the query to a SerpAPI-style endpoint when a key is configured.
//! Never fails the caller: a missing key, a rejected call, or an
//! unparseable body substitutes static results annotated as fallback.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hudgate_config::SearchConfig;

const MAX_RESULTS: usize = 5;

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A search response, annotated when it is fallback data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub fallback: bool,
}

// --- Upstream wire types (SerpAPI organic-results shape) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    organic_results: Vec<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Relays web searches to a key-authenticated search API.
pub struct WebSearchService {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl WebSearchService {
    pub fn new(config: &SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.clone(),
            client,
        }
    }

    /// Search the web. Infallible: any failure degrades to static results.
    pub async fn search(&self, query: &str, count: usize) -> SearchResults {
        let count = count.clamp(1, MAX_RESULTS);

        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No search API key configured; serving fallback results");
            return fallback_results(query, count);
        };

        let result = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query.to_string()),
                ("num", count.to_string()),
                ("api_key", api_key.to_string()),
            ])
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Web search failed; serving fallback results");
                return fallback_results(query, count);
            }
        };

        if !response.status().is_success() {
            warn!(
                status = response.status().as_u16(),
                "Search upstream rejected request; serving fallback results"
            );
            return fallback_results(query, count);
        }

        match response.json::<ApiResponse>().await {
            Ok(api) => SearchResults {
                results: api
                    .organic_results
                    .into_iter()
                    .take(count)
                    .map(|r| SearchResult {
                        title: r.title,
                        url: r.link,
                        snippet: r.snippet,
                    })
                    .collect(),
                fallback: false,
            },
            Err(e) => {
                warn!(error = %e, "Unparseable search response; serving fallback results");
                fallback_results(query, count)
            }
        }
    }
}

/// Deterministic stand-in results for a query.
fn fallback_results(query: &str, count: usize) -> SearchResults {
    let results = (0..count)
        .map(|i| SearchResult {
            title: format!("Result {} for: {}", i + 1, query),
            url: format!("https://example.com/search?q={}&p={}", urlencode(query), i + 1),
            snippet: format!(
                "Search is running in offline mode. Configure a search API key \
                 to get live results for '{query}'."
            ),
        })
        .collect();

    SearchResults {
        results,
        fallback: true,
    }
}

fn urlencode(s: &str) -> String {
    s.replace(' ', "+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_serves_fallback() {
        let service = WebSearchService::new(&SearchConfig::default());
        let results = service.search("rust async", 3).await;

        assert!(results.fallback);
        assert_eq!(results.results.len(), 3);
        assert!(results.results[0].title.contains("rust async"));
    }

    #[tokio::test]
    async fn fallback_is_deterministic() {
        let service = WebSearchService::new(&SearchConfig::default());
        let a = service.search("same query", 2).await;
        let b = service.search("same query", 2).await;

        assert_eq!(a.results[0].url, b.results[0].url);
        assert_eq!(a.results[1].title, b.results[1].title);
    }

    #[tokio::test]
    async fn count_is_clamped() {
        let service = WebSearchService::new(&SearchConfig::default());
        assert_eq!(service.search("q", 0).await.results.len(), 1);
        assert_eq!(service.search("q", 100).await.results.len(), MAX_RESULTS);
    }

    #[test]
    fn api_response_parses_organic_results() {
        let json = r#"{
            "organic_results": [
                {"title": "The Rust Book", "link": "https://doc.rust-lang.org/book/", "snippet": "Learn Rust."},
                {"title": "crates.io", "link": "https://crates.io/", "snippet": "The registry."}
            ]
        }"#;
        let api: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(api.organic_results.len(), 2);
        assert_eq!(api.organic_results[0].title, "The Rust Book");
    }

    #[test]
    fn query_urlencoding_for_fallback_links() {
        assert_eq!(urlencode("two words"), "two+words");
    }
}
