//! Integration Tests Module
//!
//! End-to-end tests for the analysis pipeline and configuration layer,
//! driven by fake LLM, search, and fetch backends.

// Fake providers and fixtures
mod support;

// Orchestrator pipeline tests
mod pipeline_test;

// Configuration store tests
mod config_test;
