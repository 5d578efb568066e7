//! WebSearch Service
//!
//! Pluggable web search with support for Tavily, Brave Search, and DuckDuckGo
//! backends. Results are returned in ranking order.

use std::time::Duration;

use async_trait::async_trait;
use game_advisor_core::{AdvisorError, AdvisorResult, Stage};

/// Request timeout for search backends
const SEARCH_TIMEOUT_SECS: u64 = 15;

/// A search result entry
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Backend relevance in [0, 1], when the backend reports one
    pub score: Option<f64>,
}

/// Trait for pluggable search providers
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for display
    fn name(&self) -> &str;

    /// Execute a search query
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String>;
}

fn str_field(item: &serde_json::Value, key: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Tavily search provider (requires API key)
struct TavilyProvider {
    client: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn name(&self) -> &str {
        "Tavily"
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
            "include_answer": false,
        });

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Tavily request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(format!("Tavily API error ({}): {}", status.as_u16(), err_body));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Tavily response: {}", e))?;

        Ok(data
            .get("results")
            .and_then(|r| r.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|item| SearchResult {
                        title: str_field(item, "title"),
                        url: str_field(item, "url"),
                        snippet: str_field(item, "content"),
                        score: item
                            .get("score")
                            .and_then(|s| s.as_f64())
                            .map(|s| s.clamp(0.0, 1.0)),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Brave Search provider (requires API key)
struct BraveSearchProvider {
    client: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    fn name(&self) -> &str {
        "Brave Search"
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String> {
        let response = self
            .client
            .get("https://api.search.brave.com/res/v1/web/search")
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| format!("Brave Search request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(format!(
                "Brave Search API error ({}): {}",
                status.as_u16(),
                err_body
            ));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Brave Search response: {}", e))?;

        Ok(data
            .get("web")
            .and_then(|w| w.get("results"))
            .and_then(|r| r.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|item| SearchResult {
                        title: str_field(item, "title"),
                        url: str_field(item, "url"),
                        snippet: str_field(item, "description"),
                        score: None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// DuckDuckGo instant answer provider (no API key required, limited results)
struct DuckDuckGoProvider {
    client: reqwest::Client,
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String> {
        let response = self
            .client
            .get("https://api.duckduckgo.com/")
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await
            .map_err(|e| format!("DuckDuckGo request failed: {}", e))?;

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse DuckDuckGo response: {}", e))?;

        let mut results = Vec::new();

        let abstract_text = str_field(&data, "AbstractText");
        if !abstract_text.is_empty() {
            let heading = str_field(&data, "Heading");
            results.push(SearchResult {
                title: if heading.is_empty() {
                    "Result".to_string()
                } else {
                    heading
                },
                url: str_field(&data, "AbstractURL"),
                snippet: abstract_text,
                score: None,
            });
        }

        if let Some(topics) = data.get("RelatedTopics").and_then(|r| r.as_array()) {
            for topic in topics {
                if results.len() >= max_results as usize {
                    break;
                }
                let text = str_field(topic, "Text");
                if !text.is_empty() {
                    results.push(SearchResult {
                        title: text.chars().take(80).collect(),
                        url: str_field(topic, "FirstURL"),
                        snippet: text,
                        score: None,
                    });
                }
            }
        }

        Ok(results)
    }
}

/// WebSearch service with pluggable provider
pub struct WebSearchService {
    provider: Box<dyn SearchProvider>,
}

impl WebSearchService {
    /// Create a new WebSearch service with the named backend.
    ///
    /// - `"tavily"` requires an API key
    /// - `"brave"` requires an API key
    /// - `"duckduckgo"` works without an API key (limited results)
    pub fn new(provider_name: &str, api_key: Option<&str>) -> AdvisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .user_agent(game_advisor_llm::http_client::USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());

        let provider: Box<dyn SearchProvider> = match provider_name.to_lowercase().as_str() {
            "tavily" => {
                let key = api_key.ok_or_else(|| {
                    AdvisorError::config("Tavily requires search_api_key in config.json")
                })?;
                Box::new(TavilyProvider {
                    client,
                    api_key: key.to_string(),
                })
            }
            "brave" | "brave_search" => {
                let key = api_key.ok_or_else(|| {
                    AdvisorError::config("Brave Search requires search_api_key in config.json")
                })?;
                Box::new(BraveSearchProvider {
                    client,
                    api_key: key.to_string(),
                })
            }
            "duckduckgo" | "" => Box::new(DuckDuckGoProvider { client }),
            other => {
                return Err(AdvisorError::config(format!(
                    "Unknown search provider: '{}'. Supported: tavily, brave, duckduckgo",
                    other
                )))
            }
        };

        Ok(Self { provider })
    }

    /// Wrap a custom backend
    pub fn with_provider(provider: Box<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Execute a web search, returning at most `max_results` (capped at 10) hits.
    pub async fn search(&self, query: &str, max_results: u32) -> AdvisorResult<Vec<SearchResult>> {
        let max_results = max_results.clamp(1, 10);

        // Sanitize query: strip control chars
        let query: String = query
            .chars()
            .filter(|c| !c.is_control() || *c == ' ')
            .collect();

        if query.trim().is_empty() {
            return Err(AdvisorError::validation("Search query cannot be empty"));
        }

        let mut results = self
            .provider
            .search(&query, max_results)
            .await
            .map_err(|e| AdvisorError::provider(Stage::Research, e))?;
        results.truncate(max_results as usize);

        tracing::debug!(
            "[Research] {} returned {} results for \"{}\"",
            self.provider.name(),
            results.len(),
            query
        );

        Ok(results)
    }

    /// Get the name of the underlying search provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
