//! Research Gatherer
//!
//! Runs the web search for one analysis and, in full-article mode, fetches
//! each hit with bounded concurrency. Individual fetch failures fall back to
//! the search snippet; only the search call itself can fail the stage.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use game_advisor_core::{AdvisorError, AdvisorResult, AnalysisRequest, ResearchMode, ResearchResult};
use tokio_util::sync::CancellationToken;

use super::web_fetch::{truncate_chars, ArticleFetcher};
use super::web_search::{SearchResult, WebSearchService};
use crate::models::settings::ResearchSettings;
use crate::services::analysis::progress::ProgressTracker;
use crate::services::cancellation::cancellable;

/// Progress job the per-article jobs are inserted in front of
pub const RESEARCH_JOB: &str = "research";

/// Longest query sent to a search backend
const MAX_QUERY_CHARS: usize = 300;

pub struct ResearchGatherer {
    search: WebSearchService,
    fetcher: Arc<dyn ArticleFetcher>,
    settings: ResearchSettings,
}

impl ResearchGatherer {
    pub fn new(
        search: WebSearchService,
        fetcher: Arc<dyn ArticleFetcher>,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            search,
            fetcher,
            settings,
        }
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    /// Search for material relevant to `request` and return it in ranking
    /// order, never more than `max_results` entries.
    ///
    /// When `progress` has a [`RESEARCH_JOB`], article jobs are inserted
    /// before it and its progress follows the fetches.
    pub async fn research(
        &self,
        request: &AnalysisRequest,
        description: &str,
        mode: ResearchMode,
        progress: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Vec<ResearchResult>> {
        let query = build_search_query(request.domain(), request.prompt(), description);
        let max_results = self.settings.max_results;
        tracing::info!(
            "[Research] Searching via {} ({}): {}",
            self.search.provider_name(),
            mode,
            query
        );

        let mut hits = cancellable(cancel, self.search.search(&query, max_results)).await?;
        hits.truncate(max_results as usize);
        let total = hits.len();

        let results = match mode {
            ResearchMode::SummaryOnly => hits
                .into_iter()
                .enumerate()
                .filter_map(|(i, hit)| snippet_result(hit, i, total))
                .collect(),
            ResearchMode::FullArticle => self.fetch_articles(hits, progress, cancel).await?,
        };

        tracing::info!("[Research] {} results gathered", results.len());
        Ok(results)
    }

    async fn fetch_articles(
        &self,
        hits: Vec<SearchResult>,
        progress: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Vec<ResearchResult>> {
        let total = hits.len();
        let track = progress.has_job(RESEARCH_JOB);

        // One job per fetchable article, discovered only after the search
        let fetchable: Vec<usize> = hits
            .iter()
            .enumerate()
            .filter(|(_, hit)| !hit.url.trim().is_empty())
            .map(|(i, _)| i)
            .collect();
        if track {
            for &i in &fetchable {
                let tag = article_tag(i);
                progress.insert_job_before(RESEARCH_JOB, &tag, &article_name(&hits[i]))?;
                progress.start(&tag)?;
            }
        }

        let fetcher = &self.fetcher;
        let urls: Vec<(usize, String)> = fetchable
            .iter()
            .map(|&i| (i, hits[i].url.clone()))
            .collect();
        let mut fetches = stream::iter(urls.into_iter().map(|(i, url)| async move {
            let outcome = fetcher.fetch(&url).await;
            (i, outcome)
        }))
        .buffered(self.settings.max_concurrent_fetches.max(1));

        let mut articles: Vec<Option<String>> = vec![None; total];
        let mut done = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AdvisorError::Cancelled),
                next = fetches.next() => next,
            };
            let Some((i, outcome)) = next else { break };
            done += 1;

            let tag = article_tag(i);
            match outcome {
                Ok(text) if !text.trim().is_empty() => {
                    articles[i] = Some(truncate_chars(&text, self.settings.max_article_chars));
                    if track {
                        progress.complete(&tag)?;
                    }
                }
                Ok(_) => {
                    tracing::warn!("[Research] Empty article at {}, using snippet", hits[i].url);
                    if track {
                        progress.fail(&tag)?;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "[Research] Fetch failed for {}: {}; using snippet",
                        hits[i].url,
                        e
                    );
                    if track {
                        progress.fail(&tag)?;
                    }
                }
            }
            if track && !fetchable.is_empty() {
                progress.advance(RESEARCH_JOB, done as f64 * 100.0 / fetchable.len() as f64)?;
            }
        }

        Ok(hits
            .into_iter()
            .zip(articles)
            .enumerate()
            .filter_map(|(i, (hit, article))| match article {
                Some(content) => Some(ResearchResult {
                    title: hit.title.clone(),
                    url: hit.url.clone(),
                    content,
                    relevance_score: relevance_score(hit.score, i, total),
                }),
                None => snippet_result(hit, i, total),
            })
            .collect())
    }
}

fn article_tag(index: usize) -> String {
    format!("article-{}", index + 1)
}

fn article_name(hit: &SearchResult) -> String {
    let title = if hit.title.trim().is_empty() {
        hit.url.as_str()
    } else {
        hit.title.as_str()
    };
    format!("Fetch: {}", title.chars().take(60).collect::<String>())
}

/// Backend score when present, otherwise derived from rank.
fn relevance_score(score: Option<f64>, index: usize, total: usize) -> f64 {
    match score {
        Some(s) if s.is_finite() => s.clamp(0.0, 1.0),
        _ if total == 0 => 0.0,
        _ => 1.0 - index as f64 / total as f64,
    }
}

fn snippet_result(hit: SearchResult, index: usize, total: usize) -> Option<ResearchResult> {
    if hit.snippet.trim().is_empty() {
        return None;
    }
    Some(ResearchResult {
        relevance_score: relevance_score(hit.score, index, total),
        title: hit.title,
        url: hit.url,
        content: hit.snippet,
    })
}

/// Frame the search query from the domain, the question, and the first
/// sentence of the image description.
pub fn build_search_query(domain: Option<&str>, prompt: &str, description: &str) -> String {
    let first_sentence = description
        .split_inclusive(['.', '!', '?', '\n'])
        .next()
        .unwrap_or("")
        .trim();

    let parts: Vec<&str> = [domain.unwrap_or(""), prompt.trim(), first_sentence]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    let query = parts.join(" ");
    let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
    query.chars().take(MAX_QUERY_CHARS).collect()
}
