//! Recommendation Synthesizer
//!
//! Builds the combined prompt, asks the provider for a structured
//! recommendation, and validates the answer strictly. There is no retry on
//! a parse failure.

use std::sync::Arc;

use chrono::Utc;
use game_advisor_core::{
    AdvisorError, AdvisorResult, Priority, Recommendation, RecommendationItem, RecommendationKind,
    ResearchResult, Stage,
};
use game_advisor_llm::{LlmProvider, LlmRequestOptions, Message};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::prompts::{build_synthesis_prompt, recommendation_format, SYNTHESIS_SYSTEM_PROMPT};
use crate::services::cancellation::cancellable;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecommendation {
    analysis: String,
    summary: String,
    recommendations: Vec<RawItem>,
    confidence: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    priority: String,
    action: String,
    reasoning: String,
    context: String,
    #[serde(default)]
    reference_link: Option<String>,
}

pub struct RecommendationSynthesizer {
    provider: Arc<dyn LlmProvider>,
}

impl RecommendationSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn synthesize(
        &self,
        description: &str,
        research: &[ResearchResult],
        rule_text: &str,
        user_prompt: &str,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Recommendation> {
        let prompt = build_synthesis_prompt(description, research, rule_text, user_prompt);
        let mut options = LlmRequestOptions::structured(recommendation_format());
        options.enable_web_search = self.provider.supports_native_search();

        tracing::debug!(
            "[Synthesize] Prompt {} chars, {} research results, native search={}",
            prompt.len(),
            research.len(),
            options.enable_web_search
        );

        let response = cancellable(cancel, async {
            self.provider
                .send_message(
                    vec![Message::user(prompt)],
                    Some(SYNTHESIS_SYSTEM_PROMPT.to_string()),
                    options,
                )
                .await
                .map_err(|e| e.into_advisor(Stage::Synthesis))
        })
        .await?;

        let content = response
            .require_content()
            .map_err(|e| AdvisorError::parse(format!("Recommendation: {}", e)))?;
        parse_recommendation(content, &self.provider.config().name)
    }
}

/// Strict parse of the recommendation object.
///
/// Missing fields, an unknown priority, or a confidence outside [0, 1] are
/// parse errors. Reference links that are not absolute `https` URLs are
/// dropped.
pub fn parse_recommendation(content: &str, provider_name: &str) -> AdvisorResult<Recommendation> {
    let raw: RawRecommendation = serde_json::from_str(content.trim())
        .map_err(|e| AdvisorError::parse(format!("Invalid recommendation: {}", e)))?;

    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        return Err(AdvisorError::parse(format!(
            "Confidence {} is outside [0, 1]",
            raw.confidence
        )));
    }

    let recommendations = raw
        .recommendations
        .into_iter()
        .map(|item| -> AdvisorResult<RecommendationItem> {
            Ok(RecommendationItem {
                priority: item.priority.parse::<Priority>()?,
                action: item.action,
                reasoning: item.reasoning,
                context: item.context,
                reference_link: item.reference_link.as_deref().and_then(https_link),
            })
        })
        .collect::<AdvisorResult<Vec<_>>>()?;

    Ok(Recommendation {
        kind: RecommendationKind::Advice,
        analysis: raw.analysis,
        summary: raw.summary,
        recommendations,
        confidence: raw.confidence,
        timestamp: Utc::now(),
        provider_name: provider_name.to_string(),
    })
}

/// Keep a link only when it is an absolute `https` URL with a host.
fn https_link(link: &str) -> Option<String> {
    let url = url::Url::parse(link.trim()).ok()?;
    (url.scheme() == "https" && url.host_str().is_some()).then(|| link.trim().to_string())
}
