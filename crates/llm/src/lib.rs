//! Game Advisor LLM
//!
//! Provides a unified interface for vision-capable LLM providers:
//! - OpenAI (and OpenAI-compatible local servers)
//! - Anthropic Claude
//! - Ollama (local inference)
//!
//! Also includes the HTTP client factory and the provider registry.

pub mod anthropic;
pub mod http_client;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod registry;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use registry::{ProviderConstructor, ProviderHandle, ProviderRegistry};
pub use types::*;
