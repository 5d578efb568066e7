//! WebFetch Service
//!
//! Fetches article pages and converts HTML to markdown, with caching and
//! SSRF protection.

use std::time::Duration;

use async_trait::async_trait;
use game_advisor_core::{AdvisorError, AdvisorResult, Stage};
use mini_moka::sync::Cache;

use super::url_validation::{is_private_host, validate_url_ssrf};

/// Maximum download size (10MB)
const MAX_DOWNLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum redirects followed per fetch
const MAX_REDIRECTS: usize = 5;

/// Cache TTL (15 minutes)
const CACHE_TTL_SECS: u64 = 15 * 60;

/// Maximum cache entries
const MAX_CACHE_ENTRIES: u64 = 100;

/// Marker appended when an article is cut at the character cap
const TRUNCATION_MARKER: &str = "\n\n... (content truncated)";

/// Backend that turns an article URL into readable text.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AdvisorResult<String>;
}

/// WebFetch service with persistent client and in-memory cache
pub struct WebFetchService {
    client: reqwest::Client,
    cache: Cache<String, String>,
    max_output_chars: usize,
}

impl WebFetchService {
    /// Create a fetcher whose output is capped at `max_output_chars` characters
    pub fn new(max_output_chars: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(game_advisor_llm::http_client::USER_AGENT)
            .redirect(redirect_policy())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let cache = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();

        Self {
            client,
            cache,
            max_output_chars,
        }
    }

    async fn fetch_uncached(&self, url: &url::Url) -> AdvisorResult<String> {
        let fail = |msg: String| AdvisorError::provider(Stage::Research, msg);

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| fail(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!(
                "HTTP error fetching {}: {} {}",
                url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > MAX_DOWNLOAD_SIZE as u64 {
                return Err(fail(format!(
                    "Content too large: {:.1} MB (max {:.1} MB)",
                    content_length as f64 / (1024.0 * 1024.0),
                    MAX_DOWNLOAD_SIZE as f64 / (1024.0 * 1024.0)
                )));
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(format!("Failed to read response body: {}", e)))?;

        if bytes.len() > MAX_DOWNLOAD_SIZE {
            return Err(fail(format!(
                "Response too large: {:.1} MB (max {:.1} MB)",
                bytes.len() as f64 / (1024.0 * 1024.0),
                MAX_DOWNLOAD_SIZE as f64 / (1024.0 * 1024.0)
            )));
        }

        let body = String::from_utf8_lossy(&bytes).to_string();
        let text = to_readable_text(&body, &content_type)?;
        Ok(truncate_chars(&text, self.max_output_chars))
    }
}

#[async_trait]
impl ArticleFetcher for WebFetchService {
    async fn fetch(&self, url_str: &str) -> AdvisorResult<String> {
        let url = validate_url_ssrf(url_str).await?;
        let key = url.to_string();

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("[Research] Article cache hit: {}", key);
            return Ok(cached);
        }

        let text = self.fetch_uncached(&url).await?;
        self.cache.insert(key, text.clone());
        Ok(text)
    }
}

/// Follow at most [`MAX_REDIRECTS`] hops, never onto a non-HTTPS or private
/// target.
fn redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        match check_redirect(attempt.url(), attempt.previous().len()) {
            Ok(()) => attempt.follow(),
            Err(reason) => attempt.error(reason),
        }
    })
}

fn check_redirect(target: &url::Url, hops: usize) -> Result<(), String> {
    if hops > MAX_REDIRECTS {
        return Err(format!("Too many redirects (max {})", MAX_REDIRECTS));
    }
    if target.scheme() != "https" {
        return Err(format!("Redirect to non-HTTPS URL {}", target));
    }
    match target.host_str() {
        Some(host) if !is_private_host(host) => Ok(()),
        _ => Err(format!("Redirect to private or local host blocked: {}", target)),
    }
}

/// Convert a response body to markdown when it is HTML.
fn to_readable_text(body: &str, content_type: &str) -> AdvisorResult<String> {
    let is_html = content_type.contains("text/html") || content_type.contains("application/xhtml");
    if !is_html {
        return Ok(body.trim().to_string());
    }
    htmd::convert(body)
        .map(|md| md.trim().to_string())
        .map_err(|e| {
            AdvisorError::provider(Stage::Research, format!("HTML conversion failed: {}", e))
        })
}

/// Cut `text` at `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut truncated = text[..byte_index].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text.to_string(),
    }
}
