//! HTTP Client Factory
//!
//! Builds the reqwest client shared by one bound provider.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// User agent sent on every provider request.
pub const USER_AGENT: &str = concat!("GameAdvisor/", env!("CARGO_PKG_VERSION"));

/// Build a `reqwest::Client` with the configured request timeout.
///
/// Environment proxies are honored by reqwest's defaults.
pub fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LlmError::Configuration {
            message: format!("Failed to build HTTP client: {}", e),
        })
}
