//! Result Cache
//!
//! Content-addressed store of finished recommendations. Keys are SHA-256
//! digests over a canonical description of everything that shapes the
//! result, so a repeated evaluation run can skip the provider calls.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use game_advisor_core::{AdvisorResult, AnalysisRequest, Recommendation, ResearchMode};
use game_advisor_llm::ProviderConfiguration;
use mini_moka::sync::Cache;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::utils::paths::ensure_dir;

/// Storage backend for recommendations.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> AdvisorResult<Option<Recommendation>>;
    fn put(&self, key: &str, recommendation: &Recommendation) -> AdvisorResult<()>;
}

/// Canonical key document. Field order is fixed by the struct.
#[derive(Serialize)]
struct KeyInput<'a> {
    image_sha256: String,
    mime_type: &'a str,
    prompt: &'a str,
    domain: Option<&'a str>,
    provider: &'a str,
    model: &'a str,
    research: Option<ResearchMode>,
    rules: bool,
    rule_files: Vec<&'a str>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Deterministic key for one analysis. Rule file order does not matter.
pub fn cache_key(
    request: &AnalysisRequest,
    provider: &ProviderConfiguration,
    research: Option<ResearchMode>,
    rules_enabled: bool,
    rule_files: &[String],
) -> AdvisorResult<String> {
    let mut sorted: Vec<&str> = rule_files.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let input = KeyInput {
        image_sha256: sha256_hex(request.image().bytes()),
        mime_type: request.image().mime_type(),
        prompt: request.prompt().trim(),
        domain: request.domain(),
        provider: &provider.name,
        model: &provider.model,
        research,
        rules: rules_enabled,
        rule_files: if rules_enabled { sorted } else { Vec::new() },
    };
    let canonical = serde_json::to_vec(&input)?;
    Ok(sha256_hex(&canonical))
}

/// In-process cache with a bounded size and a time to live.
pub struct MemoryResultCache {
    cache: Cache<String, Recommendation>,
}

impl MemoryResultCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
        }
    }
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new(256, Duration::from_secs(60 * 60))
    }
}

impl ResultCache for MemoryResultCache {
    fn get(&self, key: &str) -> AdvisorResult<Option<Recommendation>> {
        Ok(self.cache.get(&key.to_string()))
    }

    fn put(&self, key: &str, recommendation: &Recommendation) -> AdvisorResult<()> {
        self.cache.insert(key.to_string(), recommendation.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per key.
#[derive(Debug, Clone)]
pub struct FileResultCache {
    directory: PathBuf,
}

impl FileResultCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.json", key))
    }
}

impl ResultCache for FileResultCache {
    fn get(&self, key: &str) -> AdvisorResult<Option<Recommendation>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(recommendation) => Ok(Some(recommendation)),
            Err(e) => {
                tracing::warn!(
                    "[Cache] Ignoring unreadable entry {}: {}",
                    path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, recommendation: &Recommendation) -> AdvisorResult<()> {
        ensure_dir(&self.directory)?;
        let content = serde_json::to_string_pretty(recommendation)?;
        fs::write(self.entry_path(key), content)?;
        Ok(())
    }
}
