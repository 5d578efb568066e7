//! Analysis Pipeline
//!
//! Image description, recommendation synthesis, progress tracking, and the
//! orchestrator that sequences them.

pub mod describer;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod synthesizer;

pub use describer::{ImageDescriber, ImageDescription};
pub use orchestrator::{AnalysisOrchestrator, AnalyzeOptions};
pub use progress::{LogProgressSink, NoopProgressSink, ProgressTracker, WatchProgressSink};
pub use synthesizer::{parse_recommendation, RecommendationSynthesizer};
