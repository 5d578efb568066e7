//! Settings Models
//!
//! Advisor configuration stored in config.json.

use std::path::PathBuf;

use game_advisor_core::{AdvisorResult, ResearchMode};
use game_advisor_llm::ProviderConfiguration;
use serde::{Deserialize, Serialize};

use crate::utils::paths::{default_cache_dir, default_rules_dir, expand_home};

/// Search backends understood by the research stage
pub const SEARCH_PROVIDERS: &[&str] = &["tavily", "brave", "duckduckgo", "none"];

/// Hard cap on search results per query
pub const MAX_SEARCH_RESULTS: u32 = 10;

/// Advisor configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Named LLM endpoints
    #[serde(default)]
    pub providers: Vec<ProviderConfiguration>,
    /// Provider used when none is named on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    /// Web search provider: "tavily", "brave", "duckduckgo", or "none"
    #[serde(default = "default_search_provider")]
    pub search_provider: String,
    /// API key for Tavily or Brave
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_api_key: Option<String>,
    #[serde(default)]
    pub research: ResearchSettings,
    /// Root of the per-domain rule directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_directory: Option<String>,
    /// Rule files to inject when a domain is named
    #[serde(default)]
    pub rule_files: Vec<String>,
    /// Screenshots scoring below this are rejected before research
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Research stage tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSettings {
    #[serde(default)]
    pub mode: ResearchMode,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Per-article character cap in full-article mode
    #[serde(default = "default_max_article_chars")]
    pub max_article_chars: usize,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to ~/.game-advisor/cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn default_search_provider() -> String {
    "duckduckgo".to_string()
}

fn default_relevance_threshold() -> f64 {
    0.3
}

fn default_max_results() -> u32 {
    5
}

fn default_max_article_chars() -> usize {
    8000
}

fn default_max_concurrent_fetches() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            default_provider: None,
            search_provider: default_search_provider(),
            search_api_key: None,
            research: ResearchSettings::default(),
            rules_directory: None,
            rule_files: Vec::new(),
            relevance_threshold: default_relevance_threshold(),
            cache: CacheSettings::default(),
        }
    }
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            mode: ResearchMode::default(),
            max_results: default_max_results(),
            max_article_chars: default_max_article_chars(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

impl AdvisorConfig {
    /// Look up a provider by its unique name
    pub fn provider(&self, name: &str) -> Option<&ProviderConfiguration> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Whether a research backend is configured
    pub fn research_enabled(&self) -> bool {
        !self.search_provider.eq_ignore_ascii_case("none")
    }

    /// Rules root with `~` expanded
    pub fn rules_dir(&self) -> AdvisorResult<PathBuf> {
        match self.rules_directory.as_deref() {
            Some(dir) => expand_home(dir),
            None => default_rules_dir(),
        }
    }

    /// Cache directory with `~` expanded
    pub fn cache_dir(&self) -> AdvisorResult<PathBuf> {
        match self.cache.directory.as_deref() {
            Some(dir) => expand_home(dir),
            None => default_cache_dir(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Provider names must be unique keys
        for (i, provider) in self.providers.iter().enumerate() {
            if provider.name.trim().is_empty() {
                return Err(format!("Provider #{} has an empty name", i + 1));
            }
            if self.providers[..i].iter().any(|p| p.name == provider.name) {
                return Err(format!("Duplicate provider name: {}", provider.name));
            }
            if provider.model.trim().is_empty() {
                return Err(format!("Provider '{}' has no model", provider.name));
            }
        }

        if let Some(default) = self.default_provider.as_deref() {
            if self.provider(default).is_none() {
                return Err(format!(
                    "default_provider '{}' is not among the configured providers",
                    default
                ));
            }
        }

        if !SEARCH_PROVIDERS.contains(&self.search_provider.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid search_provider: {}. Must be one of {}",
                self.search_provider,
                SEARCH_PROVIDERS.join(", ")
            ));
        }

        if self.research.max_results == 0 || self.research.max_results > MAX_SEARCH_RESULTS {
            return Err(format!(
                "research.max_results must be between 1 and {}",
                MAX_SEARCH_RESULTS
            ));
        }

        if self.research.max_concurrent_fetches == 0 {
            return Err("research.max_concurrent_fetches must be at least 1".to_string());
        }

        if self.research.max_article_chars < 100 {
            return Err("research.max_article_chars must be at least 100".to_string());
        }

        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(format!(
                "relevance_threshold must be within [0, 1], got {}",
                self.relevance_threshold
            ));
        }

        Ok(())
    }
}
