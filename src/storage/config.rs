//! JSON Configuration Management
//!
//! Handles reading and writing the advisor configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use game_advisor_core::{AdvisorError, AdvisorResult};
use game_advisor_llm::ProviderConfiguration;

use crate::models::settings::AdvisorConfig;
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for the advisor settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AdvisorConfig,
}

impl ConfigService {
    /// Load ~/.game-advisor/config.json, writing defaults on first run
    pub fn new() -> AdvisorResult<Self> {
        Self::open(config_path()?)
    }

    /// Load an explicit config file, writing defaults when it does not exist
    pub fn open(config_path: impl Into<PathBuf>) -> AdvisorResult<Self> {
        let config_path = config_path.into();
        if let Some(parent) = config_path.parent() {
            ensure_dir(parent)?;
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            tracing::info!(
                "[Config] Writing default configuration to {}",
                config_path.display()
            );
            let default_config = AdvisorConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AdvisorResult<AdvisorConfig> {
        let content = fs::read_to_string(path)?;
        let config: AdvisorConfig = serde_json::from_str(&content).map_err(|e| {
            AdvisorError::config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate().map_err(AdvisorError::config)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AdvisorConfig) -> AdvisorResult<()> {
        config.validate().map_err(AdvisorError::config)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Look up a provider, falling back to `default_provider` when `name` is None
    pub fn provider(&self, name: Option<&str>) -> AdvisorResult<&ProviderConfiguration> {
        let name = name
            .or(self.config.default_provider.as_deref())
            .ok_or_else(|| {
                AdvisorError::config("No provider named and no default_provider configured")
            })?;
        self.config.provider(name).ok_or_else(|| {
            AdvisorError::config(format!(
                "Unknown provider '{}'. Configured: {}",
                name,
                self.provider_names().join(", ")
            ))
        })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.config.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Insert or replace a provider by name and persist
    pub fn upsert_provider(&mut self, provider: ProviderConfiguration) -> AdvisorResult<()> {
        match self
            .config
            .providers
            .iter_mut()
            .find(|p| p.name == provider.name)
        {
            Some(existing) => *existing = provider,
            None => self.config.providers.push(provider),
        }
        self.save()
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AdvisorResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }
}
