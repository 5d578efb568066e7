//! Data Models
//!
//! Configuration structures for the advisor.

pub mod settings;

pub use settings::*;
