//! Analysis Request
//!
//! The immutable input to one pipeline run.

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, AdvisorResult};
use crate::image::ImageData;

/// A validated screenshot + question pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    image: ImageData,
    prompt: String,
    domain_name: Option<String>,
}

impl AnalysisRequest {
    /// Build a request. A blank domain name is normalized to `None`.
    pub fn new(
        image: ImageData,
        prompt: impl Into<String>,
        domain_name: Option<String>,
    ) -> AdvisorResult<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(AdvisorError::validation("Prompt cannot be empty"));
        }
        let domain_name = domain_name
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(Self {
            image,
            prompt,
            domain_name,
        })
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The game/domain name, if one was supplied.
    pub fn domain(&self) -> Option<&str> {
        self.domain_name.as_deref()
    }

    /// Re-check invariants. Requests deserialized from outside bypass `new`.
    pub fn validate(&self) -> AdvisorResult<()> {
        if self.image.is_empty() {
            return Err(AdvisorError::validation("Image data cannot be empty"));
        }
        if !self.image.mime_type().starts_with("image/") {
            return Err(AdvisorError::validation(format!(
                "Invalid image MIME type '{}'",
                self.image.mime_type()
            )));
        }
        if self.prompt.trim().is_empty() {
            return Err(AdvisorError::validation("Prompt cannot be empty"));
        }
        Ok(())
    }

    /// Replace the image, keeping prompt and domain. Used after PNG normalization.
    pub fn with_image(self, image: ImageData) -> Self {
        Self { image, ..self }
    }
}
