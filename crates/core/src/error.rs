//! Core Error Types
//!
//! The error taxonomy shared by every stage of the analysis pipeline.
//! These error types are dependency-free (only thiserror + std + serde_json)
//! so the LLM and application crates can both convert into them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request validation before any I/O
    Validation,
    /// Vision call describing the screenshot
    ImageDescription,
    /// Web search and article fetch
    Research,
    /// Rule file loading and formatting
    Rules,
    /// Final structured recommendation call
    Synthesis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validation => write!(f, "validation"),
            Stage::ImageDescription => write!(f, "image description"),
            Stage::Research => write!(f, "research"),
            Stage::Rules => write!(f, "rules"),
            Stage::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Error type for the Game Advisor workspace.
///
/// None of these variants carry retry semantics. Callers that want retries
/// must re-run the whole pipeline themselves.
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Malformed request or illegal state transition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown provider kind, missing API key, bad settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream LLM/search/network failure, attributed to a stage
    #[error("Provider error during {stage}: {message}")]
    Provider { stage: Stage, message: String },

    /// Structured response failed schema validation
    #[error("Parse error: {0}")]
    Parse(String),

    /// A named rule file was requested but could not be located
    #[error("Rule file not found: {0}")]
    MissingRuleFile(String),

    /// Cooperative cancellation was observed
    #[error("Analysis cancelled")]
    Cancelled,

    /// Unknown job tag or cache entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for advisor errors
pub type AdvisorResult<T> = Result<T, AdvisorError>;

impl AdvisorError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider error attributed to a stage
    pub fn provider(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Provider {
            stage,
            message: msg.into(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a missing rule file error
    pub fn missing_rule_file(name: impl Into<String>) -> Self {
        Self::MissingRuleFile(name.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Stage attribution, when the error carries one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Provider { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Process exit code for the command-line surface.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 3,
            Self::Provider { .. } => 4,
            Self::Parse(_) | Self::Serialization(_) => 5,
            Self::MissingRuleFile(_) => 6,
            Self::Cancelled => 130,
            Self::NotFound(_) | Self::Io(_) | Self::Internal(_) => 1,
        }
    }
}

/// Convert AdvisorError to a string
impl From<AdvisorError> for String {
    fn from(err: AdvisorError) -> String {
        err.to_string()
    }
}
