//! Game Advisor - Screenshot Analysis Library
//!
//! Turns a game screenshot plus a question into structured, prioritized
//! advice. It includes:
//! - The analysis pipeline (describe, research, rules, synthesize)
//! - Web research and rule-file injection
//! - Result caching and progress reporting
//! - JSON configuration storage

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use game_advisor_core::{
    AdvisorError, AdvisorResult, AnalysisProgress, AnalysisRequest, ImageData, ProgressSink,
    Recommendation, ResearchMode,
};
pub use models::settings::AdvisorConfig;
pub use services::analysis::{AnalysisOrchestrator, AnalyzeOptions};
pub use storage::config::ConfigService;
