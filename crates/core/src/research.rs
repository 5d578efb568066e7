//! Research Types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// How much of each search hit to pull into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchMode {
    /// Use search snippets verbatim (single network call)
    #[default]
    SummaryOnly,
    /// Fetch and convert each result page to readable text
    FullArticle,
}

impl fmt::Display for ResearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResearchMode::SummaryOnly => write!(f, "summary_only"),
            ResearchMode::FullArticle => write!(f, "full_article"),
        }
    }
}

impl FromStr for ResearchMode {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" | "summary_only" | "summaryonly" => Ok(ResearchMode::SummaryOnly),
            "full" | "full_article" | "fullarticle" => Ok(ResearchMode::FullArticle),
            other => Err(AdvisorError::config(format!(
                "Unknown research mode '{}'. Supported: summary, full",
                other
            ))),
        }
    }
}

/// One grounded source handed to the synthesis prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub title: String,
    pub url: String,
    /// Full article text or the search snippet
    pub content: String,
    /// In [0, 1]
    pub relevance_score: f64,
}
