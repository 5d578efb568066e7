//! Rule File Loading
//!
//! Locates named rule files under the rules directory and parses them into
//! [`GameRule`] forests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use game_advisor_core::{AdvisorError, AdvisorResult, GameRule};
use ignore::WalkBuilder;

/// Finds and parses rule files for one domain.
#[derive(Debug, Clone)]
pub struct RuleLoader {
    rules_dir: PathBuf,
}

impl RuleLoader {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Load every named file, in the order given.
    ///
    /// No names means no rules. A name that cannot be found anywhere under
    /// the search root is a `MissingRuleFile` error.
    pub fn load(&self, domain: &str, file_names: &[String]) -> AdvisorResult<Vec<GameRule>> {
        if file_names.is_empty() {
            return Ok(Vec::new());
        }

        let root = self.search_root(domain);
        let index = index_files(&root);
        tracing::debug!(
            "[Rules] Searching {} ({} files) for {:?}",
            root.display(),
            index.len(),
            file_names
        );

        let mut rules = Vec::new();
        for name in file_names {
            let path = resolve(&root, &index, name)
                .ok_or_else(|| AdvisorError::missing_rule_file(name.clone()))?;
            let mut loaded = parse_rule_file(&path)?;
            tracing::debug!("[Rules] {} -> {} top-level rules", path.display(), loaded.len());
            rules.append(&mut loaded);
        }

        tracing::info!(
            "[Rules] Loaded {} rules from {} file(s) for {}",
            rules.iter().map(GameRule::count).sum::<usize>(),
            file_names.len(),
            domain
        );
        Ok(rules)
    }

    /// `<rules>/<domain>` (or its slug) when present, else the whole rules tree
    fn search_root(&self, domain: &str) -> PathBuf {
        [domain.to_string(), slugify(domain)]
            .into_iter()
            .filter(|d| !d.is_empty())
            .map(|d| self.rules_dir.join(d))
            .find(|p| p.is_dir())
            .unwrap_or_else(|| self.rules_dir.clone())
    }
}

/// Map of file name to the first path carrying it, in sorted walk order.
fn index_files(root: &Path) -> HashMap<String, PathBuf> {
    let mut index = HashMap::new();
    if !root.is_dir() {
        return index;
    }

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if let Some(name) = entry.path().file_name().and_then(|n| n.to_str()) {
            index
                .entry(name.to_string())
                .or_insert_with(|| entry.path().to_path_buf());
        }
    }
    index
}

/// A bare name matches anywhere in the tree (with or without `.json`);
/// a relative path is taken relative to the root and must stay inside it.
fn resolve(root: &Path, index: &HashMap<String, PathBuf>, name: &str) -> Option<PathBuf> {
    if name.contains('/') || name.contains('\\') {
        let root = root.canonicalize().ok()?;
        let direct = root.join(name).canonicalize().ok()?;
        if !direct.starts_with(&root) {
            tracing::warn!("[Rules] Ignoring rule path outside {}: {}", root.display(), name);
            return None;
        }
        return direct.is_file().then_some(direct);
    }
    index
        .get(name)
        .or_else(|| index.get(&format!("{}.json", name)))
        .cloned()
}

fn parse_rule_file(path: &Path) -> AdvisorResult<Vec<GameRule>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        AdvisorError::parse(format!("Invalid rule file {}: {}", path.display(), e))
    })
}

fn slugify(domain: &str) -> String {
    domain
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
