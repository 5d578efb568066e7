//! Provider Registry
//!
//! Explicit mapping from provider kind to a constructor function. A
//! configuration is first resolved into a [`ProviderHandle`] (all checks
//! that need no network) and then bound into a live provider.

use std::collections::HashMap;
use std::sync::Arc;

use crate::anthropic::AnthropicProvider;
use crate::http_client::build_http_client;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAIProvider;
use crate::provider::{missing_api_key_error, LlmProvider};
use crate::types::{LlmError, LlmResult, ProviderConfiguration, ProviderKind};

/// Builds a provider from its configuration and a ready HTTP client.
pub type ProviderConstructor = fn(ProviderConfiguration, reqwest::Client) -> Arc<dyn LlmProvider>;

/// A configuration that passed resolution and can be bound.
#[derive(Clone)]
pub struct ProviderHandle {
    config: ProviderConfiguration,
    constructor: ProviderConstructor,
}

impl ProviderHandle {
    pub fn config(&self) -> &ProviderConfiguration {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.config.kind
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.config.name)
            .field("kind", &self.config.kind)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Registry of provider constructors keyed by kind.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<ProviderKind, ProviderConstructor>,
}

fn openai_constructor(
    config: ProviderConfiguration,
    client: reqwest::Client,
) -> Arc<dyn LlmProvider> {
    Arc::new(OpenAIProvider::new(config, client))
}

fn anthropic_constructor(
    config: ProviderConfiguration,
    client: reqwest::Client,
) -> Arc<dyn LlmProvider> {
    Arc::new(AnthropicProvider::new(config, client))
}

fn ollama_constructor(
    config: ProviderConfiguration,
    client: reqwest::Client,
) -> Arc<dyn LlmProvider> {
    Arc::new(OllamaProvider::new(config, client))
}

impl ProviderRegistry {
    /// Empty registry; every kind must be registered explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in OpenAI, Anthropic and Ollama providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderKind::OpenAI, openai_constructor);
        registry.register(ProviderKind::Anthropic, anthropic_constructor);
        registry.register(ProviderKind::Ollama, ollama_constructor);
        registry
    }

    /// Register (or replace) the constructor for a kind.
    pub fn register(&mut self, kind: ProviderKind, constructor: ProviderConstructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Check a configuration without touching the network.
    ///
    /// Fails when the kind has no constructor, the model is blank, or an
    /// API key is required (remote endpoint) but absent.
    pub fn resolve(&self, config: &ProviderConfiguration) -> LlmResult<ProviderHandle> {
        let constructor =
            *self
                .constructors
                .get(&config.kind)
                .ok_or_else(|| LlmError::Configuration {
                    message: format!("Provider kind '{}' is not registered", config.kind),
                })?;

        if config.model.trim().is_empty() {
            return Err(LlmError::Configuration {
                message: format!("Provider '{}' has no model configured", config.name),
            });
        }

        if requires_api_key(config) && !config.has_api_key() {
            return Err(missing_api_key_error(&config.name));
        }

        Ok(ProviderHandle {
            config: config.clone(),
            constructor,
        })
    }

    /// Build the live provider for a resolved handle.
    pub fn bind(&self, handle: &ProviderHandle) -> LlmResult<Arc<dyn LlmProvider>> {
        let client = build_http_client(handle.config.timeout())?;
        tracing::debug!(
            "[Registry] Bound provider '{}' ({}, model={})",
            handle.config.name,
            handle.config.kind,
            handle.config.model
        );
        Ok((handle.constructor)(handle.config.clone(), client))
    }

    /// Resolve and bind in one step.
    pub fn create(&self, config: &ProviderConfiguration) -> LlmResult<Arc<dyn LlmProvider>> {
        let handle = self.resolve(config)?;
        self.bind(&handle)
    }
}

/// Remote endpoints need a key; Ollama and local base URLs do not.
pub fn requires_api_key(config: &ProviderConfiguration) -> bool {
    config.kind != ProviderKind::Ollama && !config.is_local_endpoint()
}
