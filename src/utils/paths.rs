//! Cross-Platform Path Utilities
//!
//! Functions for resolving the Game Advisor directories (~/.game-advisor/).

use std::path::{Path, PathBuf};

use game_advisor_core::{AdvisorError, AdvisorResult};

/// Get the user's home directory
pub fn home_dir() -> AdvisorResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AdvisorError::config("Could not determine home directory"))
}

/// Get the Game Advisor directory (~/.game-advisor/)
pub fn game_advisor_dir() -> AdvisorResult<PathBuf> {
    Ok(home_dir()?.join(".game-advisor"))
}

/// Get the config file path (~/.game-advisor/config.json)
pub fn config_path() -> AdvisorResult<PathBuf> {
    Ok(game_advisor_dir()?.join("config.json"))
}

/// Get the default rules directory (~/.game-advisor/rules/)
pub fn default_rules_dir() -> AdvisorResult<PathBuf> {
    Ok(game_advisor_dir()?.join("rules"))
}

/// Get the default result cache directory (~/.game-advisor/cache/)
pub fn default_cache_dir() -> AdvisorResult<PathBuf> {
    Ok(game_advisor_dir()?.join("cache"))
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> AdvisorResult<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None if path == "~" => home_dir(),
        None => Ok(PathBuf::from(path)),
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AdvisorResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
