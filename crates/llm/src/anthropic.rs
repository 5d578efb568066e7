//! Anthropic Provider
//!
//! Implementation of the LlmProvider trait for Anthropic's Messages API.
//! Structured output is obtained by forcing a single tool call whose input
//! schema is the requested response schema.

use async_trait::async_trait;
use serde::Deserialize;

use crate::provider::{missing_api_key_error, network_error, parse_http_error, LlmProvider};
use crate::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfiguration, StopReason, UsageStats,
};

/// Default Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Current API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Server-side web search tool version
const WEB_SEARCH_TOOL: &str = "web_search_20250305";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    config: ProviderConfiguration,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfiguration, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
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
            "temperature": request_options
                .temperature_override
                .unwrap_or(self.config.temperature),
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        let claude_messages: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| self.message_to_claude(m))
            .collect();
        body["messages"] = serde_json::json!(claude_messages);

        let web_search = request_options.enable_web_search && self.supports_native_search();
        let mut tools: Vec<serde_json::Value> = Vec::new();
        if web_search {
            tools.push(serde_json::json!({
                "type": WEB_SEARCH_TOOL,
                "name": "web_search",
                "max_uses": 5
            }));
        }

        if let Some(format) = &request_options.response_format {
            tools.push(serde_json::json!({
                "name": format.name,
                "description": "Return the final answer using exactly this schema.",
                "input_schema": format.schema
            }));
            // Forcing the output tool would stop the model from searching first
            body["tool_choice"] = if web_search {
                serde_json::json!({ "type": "any" })
            } else {
                serde_json::json!({ "type": "tool", "name": format.name })
            };
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(tools);
        }

        body
    }

    /// Convert a Message to Claude API format
    fn message_to_claude(&self, message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::Assistant => "assistant",
            _ => "user",
        };

        let blocks: Vec<serde_json::Value> = message
            .content
            .iter()
            .map(|content| match content {
                MessageContent::Text { text } => serde_json::json!({
                    "type": "text",
                    "text": text
                }),
                MessageContent::Image { media_type, data } => serde_json::json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": media_type,
                        "data": data
                    }
                }),
            })
            .collect();

        serde_json::json!({
            "role": role,
            "content": blocks
        })
    }

    /// Parse a response from the Messages API.
    ///
    /// For structured requests the content is the input of the last call to
    /// the output tool, serialized back to JSON text.
    fn parse_response(
        &self,
        response: &ClaudeResponse,
        request_options: &LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let content = match &request_options.response_format {
            Some(format) => {
                let input = response
                    .content
                    .iter()
                    .rev()
                    .find(|block| {
                        let name = block.get("name").and_then(|n| n.as_str());
                        block.get("type").and_then(|t| t.as_str()) == Some("tool_use")
                            && name == Some(format.name.as_str())
                    })
                    .and_then(|block| block.get("input"))
                    .ok_or_else(|| LlmError::ParseError {
                        message: format!("Model did not call the '{}' output tool", format.name),
                    })?;
                Some(input.to_string())
            }
            None => {
                let text = response
                    .content
                    .iter()
                    .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        };

        let stop_reason = response
            .stop_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .as_ref()
            .map(|u| UsageStats {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            stop_reason,
            usage,
            model: response.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
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
            return Err(missing_api_key_error("anthropic"));
        }

        let body = self.build_request_body(&messages, system.as_deref(), &request_options);
        tracing::debug!(
            "[Anthropic] POST {} model={} structured={}",
            self.base_url(),
            self.config.model,
            request_options.response_format.is_some()
        );

        let response = self
            .client
            .post(self.base_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(network_error)?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "anthropic"));
        }

        let claude_response: ClaudeResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(&claude_response, &request_options)
    }
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    model: String,
    /// Kept untyped: server tool blocks vary by tool version
    #[serde(default)]
    content: Vec<serde_json::Value>,
    stop_reason: Option<String>,
    usage: Option<ClaudeUsage>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderKind, ResponseFormat};

    fn provider(web_search: bool) -> AnthropicProvider {
        let mut config =
            ProviderConfiguration::new("claude", ProviderKind::Anthropic, "claude-sonnet-4-5")
                .with_api_key("sk-ant");
        config.capabilities.web_search = web_search;
        AnthropicProvider::new(config, reqwest::Client::new())
    }

    fn structured() -> LlmRequestOptions {
        LlmRequestOptions::structured(ResponseFormat::new(
            "recommendation",
            serde_json::json!({"type": "object"}),
        ))
    }

    #[test]
    fn test_image_block_is_base64_source() {
        let msg = Message::user_with_image("Describe", "image/jpeg", "BBBB");
        let value = provider(false).message_to_claude(&msg);
        assert_eq!(value["content"][0]["type"], "image");
        assert_eq!(value["content"][0]["source"]["media_type"], "image/jpeg");
        assert_eq!(value["content"][0]["source"]["data"], "BBBB");
    }

    #[test]
    fn test_structured_output_forces_tool() {
        let body = provider(false).build_request_body(&[Message::user("hi")], None, &structured());
        assert_eq!(body["tool_choice"]["type"], "tool");
        assert_eq!(body["tool_choice"]["name"], "recommendation");
        assert_eq!(body["tools"].as_array().map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_web_search_adds_server_tool() {
        let mut options = structured();
        options.enable_web_search = true;
        let body = provider(true).build_request_body(&[Message::user("hi")], None, &options);
        assert_eq!(body["tools"][0]["type"], WEB_SEARCH_TOOL);
        assert_eq!(body["tool_choice"]["type"], "any");
    }

    #[test]
    fn test_parse_structured_tool_input() {
        let raw = r#"{
            "model": "claude-sonnet-4-5",
            "content": [
                { "type": "text", "text": "Here you go" },
                { "type": "tool_use", "id": "t1", "name": "recommendation", "input": { "confidence": 0.5 } }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 3, "output_tokens": 4 }
        }"#;
        let parsed: ClaudeResponse = serde_json::from_str(raw).unwrap();
        let response = provider(false).parse_response(&parsed, &structured()).unwrap();
        assert_eq!(response.content.as_deref(), Some("{\"confidence\":0.5}"));
        assert_eq!(response.stop_reason, StopReason::ToolUse);
    }

    #[test]
    fn test_parse_structured_without_tool_call_fails() {
        let raw = r#"{ "model": "m", "content": [{ "type": "text", "text": "no" }] }"#;
        let parsed: ClaudeResponse = serde_json::from_str(raw).unwrap();
        let err = provider(false)
            .parse_response(&parsed, &structured())
            .unwrap_err();
        assert!(matches!(err, LlmError::ParseError { .. }));
    }
}
