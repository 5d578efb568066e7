//! Shared fakes for the pipeline tests.
//!
//! The fake vision provider is registered under the Ollama kind so no API
//! key is needed. Its behavior is selected by the configured model name:
//! - `*offtopic*` rates every screenshot as irrelevant
//! - `*slow*` stalls the description call until cancelled
//! - `*describe-fail*` answers the description call with a server error
//! - `*synth-fail*` answers the synthesis call with a server error
//! - `*bad-priority*` returns a recommendation with an unknown priority and
//!   counts its synthesis calls in [`BAD_PRIORITY_CALLS`]
//!
//! The synthesis answer echoes the prompt it received into `analysis`, so
//! tests can assert on exactly what the synthesizer saw.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use game_advisor::services::analysis::AnalysisOrchestrator;
use game_advisor::services::research::{
    ArticleFetcher, ResearchGatherer, SearchProvider, SearchResult, WebSearchService,
};
use game_advisor::models::settings::ResearchSettings;
use game_advisor_core::{AdvisorError, AdvisorResult, AnalysisRequest, ImageData, ResearchMode};
use game_advisor_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent,
    ProviderConfiguration, ProviderKind, ProviderRegistry, StopReason, UsageStats,
};

/// Synthesis calls made by `*bad-priority*` providers. Only one test uses
/// that model name, so the count is not shared across parallel tests.
pub static BAD_PRIORITY_CALLS: AtomicUsize = AtomicUsize::new(0);

fn server_error(stage: &str) -> LlmError {
    LlmError::ServerError {
        message: format!("{} backend exploded", stage),
        status: Some(500),
    }
}

pub struct FakeVisionProvider {
    config: ProviderConfiguration,
}

#[async_trait]
impl LlmProvider for FakeVisionProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfiguration {
        &self.config
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        _system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let format = request_options
            .response_format
            .map(|f| f.name)
            .ok_or_else(|| LlmError::ParseError {
                message: "fake provider only answers structured requests".to_string(),
            })?;

        let content = match format.as_str() {
            "image_description" => {
                if self.config.model.contains("slow") {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                if self.config.model.contains("describe-fail") {
                    return Err(server_error("vision"));
                }
                let media_type = messages
                    .iter()
                    .flat_map(|m| m.content.iter())
                    .find_map(|c| match c {
                        MessageContent::Image { media_type, .. } => Some(media_type.clone()),
                        _ => None,
                    })
                    .unwrap_or_else(|| "none".to_string());
                let relevance = if self.config.model.contains("offtopic") {
                    0.05
                } else {
                    0.9
                };
                serde_json::json!({
                    "description": format!("A boss arena with a health bar ({})", media_type),
                    "relevance": relevance,
                })
            }
            "recommendation" => {
                if self.config.model.contains("synth-fail") {
                    return Err(server_error("synthesis"));
                }
                let priority = if self.config.model.contains("bad-priority") {
                    BAD_PRIORITY_CALLS.fetch_add(1, Ordering::SeqCst);
                    "urgent"
                } else {
                    "high"
                };
                let prompt = messages
                    .iter()
                    .map(Message::text_content)
                    .collect::<Vec<_>>()
                    .join("\n");
                serde_json::json!({
                    "analysis": prompt,
                    "summary": "Dodge through the sweep, then punish.",
                    "recommendations": [{
                        "priority": priority,
                        "action": "Roll into the sweep attack",
                        "reasoning": "The sweep has a long recovery",
                        "context": "Phase one",
                        "referenceLink": "https://example.com/boss-guide"
                    }],
                    "confidence": 0.8,
                })
            }
            other => {
                return Err(LlmError::ParseError {
                    message: format!("unexpected schema {}", other),
                })
            }
        };

        Ok(LlmResponse {
            content: Some(content.to_string()),
            stop_reason: StopReason::EndTurn,
            usage: UsageStats::default(),
            model: self.config.model.clone(),
        })
    }
}

fn fake_constructor(
    config: ProviderConfiguration,
    _client: reqwest::Client,
) -> Arc<dyn LlmProvider> {
    Arc::new(FakeVisionProvider { config })
}

pub fn fake_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(ProviderKind::Ollama, fake_constructor);
    registry
}

pub fn fake_provider(model: &str) -> ProviderConfiguration {
    ProviderConfiguration::new("fake", ProviderKind::Ollama, model)
}

pub fn orchestrator(model: &str) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(&fake_registry(), &fake_provider(model))
        .unwrap()
        .with_relevance_threshold(0.3)
}

/// Search backend returning fixed hits, or failing on demand.
pub struct FakeSearch {
    pub fail: bool,
}

#[async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        "FakeSearch"
    }

    async fn search(&self, _query: &str, max_results: u32) -> Result<Vec<SearchResult>, String> {
        if self.fail {
            return Err("search backend unavailable".to_string());
        }
        Ok((0..max_results.min(3))
            .map(|i| SearchResult {
                title: format!("Boss guide {}", i),
                url: format!("https://example.com/guide/{}", i),
                snippet: format!("Snippet {}: stay behind the boss", i),
                score: None,
            })
            .collect())
    }
}

/// Fetcher where every article download fails.
pub struct FailingFetcher;

#[async_trait]
impl ArticleFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> AdvisorResult<String> {
        Err(AdvisorError::provider(
            game_advisor_core::Stage::Research,
            format!("HTTP 503 for {}", url),
        ))
    }
}

/// Fetcher returning a fixed article body.
pub struct StaticFetcher;

#[async_trait]
impl ArticleFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> AdvisorResult<String> {
        Ok(format!("Full article text from {}", url))
    }
}

/// Fetcher whose later URLs finish first, so completion order is the
/// reverse of ranking order.
pub struct ReverseTimedFetcher;

#[async_trait]
impl ArticleFetcher for ReverseTimedFetcher {
    async fn fetch(&self, url: &str) -> AdvisorResult<String> {
        let index: u64 = url
            .rsplit('/')
            .next()
            .and_then(|i| i.parse().ok())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(index * 25))).await;
        Ok(format!("article {}", index))
    }
}

/// Fetcher that never finishes within a test.
pub struct HangingFetcher;

#[async_trait]
impl ArticleFetcher for HangingFetcher {
    async fn fetch(&self, url: &str) -> AdvisorResult<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(format!("Too late for {}", url))
    }
}

pub fn gatherer(
    search_fails: bool,
    fetcher: Arc<dyn ArticleFetcher>,
    mode: ResearchMode,
) -> ResearchGatherer {
    let search = WebSearchService::with_provider(Box::new(FakeSearch { fail: search_fails }));
    let settings = ResearchSettings {
        mode,
        max_results: 3,
        ..ResearchSettings::default()
    };
    ResearchGatherer::new(search, fetcher, settings)
}

pub fn png_image() -> ImageData {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 16]);
    ImageData::new(bytes, "image/png").unwrap()
}

pub fn request(domain: Option<&str>) -> AnalysisRequest {
    AnalysisRequest::new(
        png_image(),
        "How do I beat this boss?",
        domain.map(str::to_string),
    )
    .unwrap()
}

pub const BOSS_RULES: &str = r#"[
    { "RuleId": "b1", "RuleText": "Learn the attack pattern", "Category": "Combat",
      "Children": [ { "RuleId": "b1a", "RuleText": "Roll through the sweep", "Category": "Combat" } ] }
]"#;

pub fn write_rule(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
