//! Game Rules
//!
//! Curated domain knowledge as a forest of rules. Each rule owns its
//! children outright; there is no sharing and no cycles.

use serde::{Deserialize, Serialize};

/// A single rule with its nested refinements.
///
/// Serialized with the on-disk field names (`RuleId`, `RuleText`,
/// `Category`, `Children`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameRule {
    pub rule_id: String,
    pub rule_text: String,
    pub category: String,
    #[serde(default)]
    pub children: Vec<GameRule>,
}

impl GameRule {
    pub fn new(
        rule_id: impl Into<String>,
        rule_text: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_text: rule_text.into(),
            category: category.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<GameRule>) -> Self {
        self.children = children;
        self
    }

    /// Number of rules in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(GameRule::count).sum::<usize>()
    }
}
