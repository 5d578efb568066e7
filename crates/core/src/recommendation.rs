//! Recommendation
//!
//! The owned, immutable result of one pipeline run.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// Closed priority set. Anything else is a parse error, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(AdvisorError::parse(format!(
                "Invalid priority '{}': expected high, medium or low",
                other
            ))),
        }
    }
}

/// A single prioritized action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub priority: Priority,
    pub action: String,
    pub reasoning: String,
    pub context: String,
    /// Absolute `https` URL, or absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_link: Option<String>,
}

/// Whether the run produced advice or was short-circuited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    #[default]
    Advice,
    /// The screenshot did not look relevant to the requested game
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default)]
    pub kind: RecommendationKind,
    pub analysis: String,
    pub summary: String,
    pub recommendations: Vec<RecommendationItem>,
    /// In [0, 1]
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub provider_name: String,
}

impl Recommendation {
    /// Result returned when the image relevance falls below the threshold.
    pub fn rejected(
        description: &str,
        relevance: f64,
        threshold: f64,
        domain: &str,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: RecommendationKind::Rejected,
            analysis: description.to_string(),
            summary: format!(
                "The screenshot does not appear to be from {} (relevance {:.2} below threshold {:.2}).",
                domain, relevance, threshold
            ),
            recommendations: Vec::new(),
            confidence: relevance.clamp(0.0, 1.0),
            timestamp: Utc::now(),
            provider_name: provider_name.into(),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.kind == RecommendationKind::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_is_closed_set() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!("HIGH".parse::<Priority>().is_err());
        assert!(serde_json::from_str::<Priority>("\"critical\"").is_err());
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = RecommendationItem {
            priority: Priority::Medium,
            action: "Rotate to B".to_string(),
            reasoning: "A is stacked".to_string(),
            context: "Round 4".to_string(),
            reference_link: Some("https://example.com/guide".to_string()),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"referenceLink\":\"https://example.com/guide\""));
        assert!(json.contains("\"priority\":\"medium\""));
    }

    #[test]
    fn test_rejected_result() {
        let rec = Recommendation::rejected("A spreadsheet.", 0.05, 0.3, "Hades", "openai");
        assert!(rec.is_rejected());
        assert!(rec.recommendations.is_empty());
        assert!((rec.confidence - 0.05).abs() < f64::EPSILON);
        assert!(rec.summary.contains("Hades"));
    }
}
