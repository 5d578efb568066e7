//! Rules
//!
//! Domain rule augmentation: loading rule files for a game and rendering
//! them into prompt text.

pub mod formatter;
pub mod loader;

use std::path::PathBuf;

use game_advisor_core::{AdvisorResult, GameRule};

pub use formatter::format_rules;
pub use loader::RuleLoader;

/// Loads and renders rules for the synthesis prompt.
#[derive(Debug, Clone)]
pub struct RuleInjector {
    loader: RuleLoader,
}

impl RuleInjector {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader: RuleLoader::new(rules_dir),
        }
    }

    pub fn load(&self, domain: &str, file_names: &[String]) -> AdvisorResult<Vec<GameRule>> {
        self.loader.load(domain, file_names)
    }

    pub fn format(&self, rules: &[GameRule]) -> String {
        format_rules(rules)
    }

    /// Load then format. Empty when no files are requested.
    pub fn render(&self, domain: &str, file_names: &[String]) -> AdvisorResult<String> {
        let rules = self.load(domain, file_names)?;
        Ok(self.format(&rules))
    }
}
