//! Ollama Provider
//!
//! Implementation of the LlmProvider trait for Ollama local inference over
//! the native `/api/chat` endpoint. Images travel in the per-message
//! `images` array and structured output uses the `format` JSON schema.

use async_trait::async_trait;
use serde::Deserialize;

use crate::provider::{network_error, parse_http_error, LlmProvider};
use crate::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfiguration, StopReason, UsageStats,
};

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Ollama provider for local inference
pub struct OllamaProvider {
    config: ProviderConfiguration,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: ProviderConfiguration, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Get the base URL for the Ollama server
    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(OLLAMA_DEFAULT_URL)
            .trim_end_matches('/')
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url())
    }

    /// Build the `/api/chat` request body
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut chat_messages: Vec<serde_json::Value> = Vec::new();
        if let Some(sys) = system {
            chat_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }
        for msg in messages {
            chat_messages.push(self.convert_message(msg));
        }

        let temperature = request_options
            .temperature_override
            .unwrap_or(self.config.temperature);
        let mut options = serde_json::json!({ "temperature": temperature });
        if self.config.max_tokens > 0 {
            options["num_predict"] = serde_json::json!(self.config.max_tokens);
        }

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": chat_messages,
            "stream": false,
            "options": options,
        });

        if let Some(format) = &request_options.response_format {
            body["format"] = format.schema.clone();
        }

        body
    }

    /// Convert a Message to an Ollama chat message.
    ///
    /// Ollama takes raw base64 images beside the text, not data URIs.
    fn convert_message(&self, message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };

        let images: Vec<&str> = message
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Image { data, .. } => Some(data.as_str()),
                _ => None,
            })
            .collect();

        let mut value = serde_json::json!({
            "role": role,
            "content": message.text_content(),
        });
        if !images.is_empty() {
            value["images"] = serde_json::json!(images);
        }
        value
    }

    fn parse_response(&self, response: OllamaChatResponse) -> LlmResponse {
        let content = response
            .message
            .map(|m| m.content)
            .filter(|c| !c.is_empty());

        let stop_reason = response
            .done_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        LlmResponse {
            content,
            stop_reason,
            usage: UsageStats {
                input_tokens: response.prompt_eval_count.unwrap_or(0),
                output_tokens: response.eval_count.unwrap_or(0),
            },
            model: response.model,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
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
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let body = self.build_request_body(&messages, system.as_deref(), &request_options);
        let url = self.chat_url();
        tracing::debug!(
            "[Ollama] POST {} model={} structured={}",
            url,
            self.config.model,
            request_options.response_format.is_some()
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::ProviderUnavailable {
                        message: format!(
                            "Ollama server not reachable at {}. Is Ollama running?",
                            self.base_url()
                        ),
                    }
                } else {
                    network_error(e)
                }
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(network_error)?;

        if status == 404 {
            return Err(LlmError::ModelNotFound {
                model: self.config.model.clone(),
            });
        }
        if status != 200 {
            return Err(parse_http_error(status, &body_text, "ollama"));
        }

        let chat_response: OllamaChatResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(chat_response))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: String,
    message: Option<OllamaMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
