//! Image Describer
//!
//! One vision call that turns a screenshot into a description and a
//! relevance probability for the named game.

use std::sync::Arc;

use game_advisor_core::{AdvisorError, AdvisorResult, ImageData, Stage};
use game_advisor_llm::{LlmProvider, LlmRequestOptions, Message};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::prompts::{build_description_prompt, description_format, DESCRIBE_SYSTEM_PROMPT};
use crate::services::cancellation::cancellable;

/// What the vision model saw.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescription {
    pub description: String,
    /// In [0, 1]
    pub relevance: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescription {
    description: String,
    relevance: f64,
}

pub struct ImageDescriber {
    provider: Arc<dyn LlmProvider>,
}

impl ImageDescriber {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Describe `image` and rate it against `domain`.
    ///
    /// Preconditions are checked before any I/O. Exactly one provider call
    /// is made.
    pub async fn describe(
        &self,
        image: &ImageData,
        domain: &str,
        cancel: &CancellationToken,
    ) -> AdvisorResult<ImageDescription> {
        if image.is_empty() {
            return Err(AdvisorError::validation("Image data cannot be empty"));
        }
        if !image.mime_type().starts_with("image/") {
            return Err(AdvisorError::validation(format!(
                "Invalid image MIME type '{}'",
                image.mime_type()
            )));
        }
        if domain.trim().is_empty() {
            return Err(AdvisorError::validation("Domain name cannot be empty"));
        }
        if !self.provider.supports_multimodal() {
            return Err(AdvisorError::config(format!(
                "Provider '{}' ({}) is not configured for vision input",
                self.provider.config().name,
                self.provider.model()
            )));
        }

        let message = Message::user_with_image(
            build_description_prompt(domain.trim()),
            image.mime_type(),
            image.to_base64(),
        );
        let options = LlmRequestOptions::structured(description_format());

        tracing::debug!(
            "[Describe] Sending {} byte {} image to {}",
            image.len(),
            image.mime_type(),
            self.provider.model()
        );

        let response = cancellable(cancel, async {
            self.provider
                .send_message(
                    vec![message],
                    Some(DESCRIBE_SYSTEM_PROMPT.to_string()),
                    options,
                )
                .await
                .map_err(|e| e.into_advisor(Stage::ImageDescription))
        })
        .await?;

        let content = response
            .require_content()
            .map_err(|e| AdvisorError::parse(format!("Image description: {}", e)))?;
        parse_description(content)
    }
}

/// Strict parse of the two-field description object.
pub fn parse_description(content: &str) -> AdvisorResult<ImageDescription> {
    let raw: RawDescription = serde_json::from_str(content.trim())
        .map_err(|e| AdvisorError::parse(format!("Invalid image description: {}", e)))?;

    if raw.description.trim().is_empty() {
        return Err(AdvisorError::parse("Image description is empty"));
    }
    if !raw.relevance.is_finite() || !(0.0..=1.0).contains(&raw.relevance) {
        return Err(AdvisorError::parse(format!(
            "Relevance {} is outside [0, 1]",
            raw.relevance
        )));
    }

    Ok(ImageDescription {
        description: raw.description.trim().to_string(),
        relevance: raw.relevance,
    })
}
