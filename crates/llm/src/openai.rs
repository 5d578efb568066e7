//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI-compatible chat
//! completion endpoints. Images are sent as `image_url` data URIs and
//! structured output uses the `json_schema` response format.

use async_trait::async_trait;
use serde::Deserialize;

use crate::provider::{missing_api_key_error, network_error, parse_http_error, LlmProvider};
use crate::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfiguration, StopReason, UsageStats,
};

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfiguration,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfiguration, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "stream": false,
        });

        let web_search = request_options.enable_web_search && self.supports_native_search();

        // Search-enabled models reject sampling parameters
        if !web_search {
            body["temperature"] = serde_json::json!(request_options
                .temperature_override
                .unwrap_or(self.config.temperature));
        } else {
            body["web_search_options"] = serde_json::json!({});
        }

        let mut openai_messages: Vec<serde_json::Value> = Vec::new();
        if let Some(sys) = system {
            openai_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }
        for msg in messages {
            openai_messages.push(self.message_to_openai(msg));
        }
        body["messages"] = serde_json::json!(openai_messages);

        if let Some(format) = &request_options.response_format {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": format.name,
                    "schema": format.schema,
                    "strict": true
                }
            });
        }

        body
    }

    /// Convert a Message to OpenAI API format
    fn message_to_openai(&self, message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };

        if !message.has_image() {
            return serde_json::json!({
                "role": role,
                "content": message.text_content()
            });
        }

        let parts: Vec<serde_json::Value> = message
            .content
            .iter()
            .map(|content| match content {
                MessageContent::Text { text } => serde_json::json!({
                    "type": "text",
                    "text": text
                }),
                MessageContent::Image { media_type, data } => serde_json::json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", media_type, data)
                    }
                }),
            })
            .collect();

        serde_json::json!({
            "role": role,
            "content": parts
        })
    }

    /// Parse a response from OpenAI API
    fn parse_response(&self, response: &OpenAIResponse) -> LlmResponse {
        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone());

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_ref())
            .map(|r| StopReason::from(r.as_str()))
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            stop_reason,
            usage,
            model: response.model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfiguration {
        &self.config
    }

    fn supports_native_search(&self) -> bool {
        self.config.capabilities.web_search
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        if !self.config.has_api_key() && !self.config.is_local_endpoint() {
            return Err(missing_api_key_error("openai"));
        }

        let body = self.build_request_body(&messages, system.as_deref(), &request_options);
        tracing::debug!(
            "[OpenAI] POST {} model={} structured={}",
            self.base_url(),
            self.config.model,
            request_options.response_format.is_some()
        );

        let mut request = self
            .client
            .post(self.base_url())
            .header("Content-Type", "application/json");
        if self.config.has_api_key() {
            request = request.header("Authorization", format!("Bearer {}", self.config.api_key));
        }

        let response = request.json(&body).send().await.map_err(network_error)?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(network_error)?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "openai"));
        }

        let openai_response: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        if let Some(refusal) = openai_response
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.refusal.as_ref())
        {
            return Err(LlmError::InvalidRequest {
                message: format!("Model refused: {}", refusal),
            });
        }

        Ok(self.parse_response(&openai_response))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderKind, ResponseFormat};

    fn provider(web_search: bool) -> OpenAIProvider {
        let mut config = ProviderConfiguration::new("gpt", ProviderKind::OpenAI, "gpt-4o")
            .with_api_key("sk-test");
        config.capabilities.web_search = web_search;
        OpenAIProvider::new(config, reqwest::Client::new())
    }

    #[test]
    fn test_image_message_uses_data_uri() {
        let provider = provider(false);
        let msg = Message::user_with_image("Describe", "image/png", "AAAA");
        let value = provider.message_to_openai(&msg);
        assert_eq!(value["content"][0]["type"], "image_url");
        assert_eq!(
            value["content"][0]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(value["content"][1]["text"], "Describe");
    }

    #[test]
    fn test_structured_request_body() {
        let provider = provider(false);
        let options = LlmRequestOptions::structured(ResponseFormat::new(
            "image_description",
            serde_json::json!({"type": "object"}),
        ));
        let body = provider.build_request_body(&[Message::user("hi")], Some("sys"), &options);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body.get("web_search_options").is_none());
    }

    #[test]
    fn test_web_search_only_when_capable() {
        let options = LlmRequestOptions {
            enable_web_search: true,
            ..Default::default()
        };
        let body = provider(false).build_request_body(&[Message::user("hi")], None, &options);
        assert!(body.get("web_search_options").is_none());

        let body = provider(true).build_request_body(&[Message::user("hi")], None, &options);
        assert!(body.get("web_search_options").is_some());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_parse_response() {
        let raw = r#"{
            "model": "gpt-4o",
            "choices": [{ "message": { "content": "{\"a\":1}" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        }"#;
        let parsed: OpenAIResponse = serde_json::from_str(raw).unwrap();
        let response = provider(false).parse_response(&parsed);
        assert_eq!(response.content.as_deref(), Some("{\"a\":1}"));
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.total_tokens(), 15);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let config = ProviderConfiguration::new("gpt", ProviderKind::OpenAI, "gpt-4o");
        let provider = OpenAIProvider::new(config, reqwest::Client::new());
        let err = provider
            .send_message(vec![Message::user("hi")], None, LlmRequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Configuration { .. }));
    }
}
