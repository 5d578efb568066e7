//! Services
//!
//! Business logic for the analysis pipeline.

pub mod analysis;
pub mod cache;
pub mod cancellation;
pub mod imaging;
pub mod research;
pub mod rules;
