//! Utilities
//!
//! Common utilities used throughout the application.

pub mod paths;

pub use paths::*;
