//! Game Advisor Core
//!
//! Domain types and error taxonomy for the Game Advisor workspace. This crate
//! has no dependency on providers, HTTP, or the filesystem.
//!
//! ## Module Organization
//!
//! - `error` - Error taxonomy (`AdvisorError`, `AdvisorResult`, `Stage`)
//! - `image` - Validated image value and MIME sniffing
//! - `request` - `AnalysisRequest`
//! - `progress` - Job progress aggregate and `ProgressSink`
//! - `rules` - `GameRule` forest
//! - `research` - `ResearchResult` and `ResearchMode`
//! - `recommendation` - Structured pipeline output

pub mod error;
pub mod image;
pub mod progress;
pub mod recommendation;
pub mod request;
pub mod research;
pub mod rules;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{AdvisorError, AdvisorResult, Stage};

// ── Request ────────────────────────────────────────────────────────────
pub use image::ImageData;
pub use request::AnalysisRequest;

// ── Progress ───────────────────────────────────────────────────────────
pub use progress::{AnalysisJob, AnalysisProgress, JobStatus, ProgressSink};

// ── Domain Values ──────────────────────────────────────────────────────
pub use recommendation::{Priority, Recommendation, RecommendationItem, RecommendationKind};
pub use research::{ResearchMode, ResearchResult};
pub use rules::GameRule;
