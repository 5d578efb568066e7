//! Configuration Integration Tests
//!
//! Loads a config file from disk and builds the pipeline from it.

use game_advisor::services::analysis::AnalysisOrchestrator;
use game_advisor::storage::config::ConfigService;
use game_advisor_core::AdvisorError;
use tokio_util::sync::CancellationToken;

use super::support::*;

fn write_config(dir: &std::path::Path, search_provider: &str) -> std::path::PathBuf {
    let rules_dir = dir.join("rules");
    let cache_dir = dir.join("cache");
    write_rule(&rules_dir, "elden-ring/bosses.json", BOSS_RULES);

    let config = serde_json::json!({
        "providers": [
            { "name": "local", "kind": "ollama", "model": "vision" },
            { "name": "picky", "kind": "ollama", "model": "offtopic-vision" }
        ],
        "default_provider": "local",
        "search_provider": search_provider,
        "rules_directory": rules_dir.to_string_lossy(),
        "rule_files": ["bosses"],
        "relevance_threshold": 0.5,
        "cache": { "enabled": true, "directory": cache_dir.to_string_lossy() }
    });
    let path = dir.join("config.json");
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn test_missing_config_file_is_created_with_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nested").join("config.json");

    let service = ConfigService::open(&path).unwrap();
    assert!(path.exists());
    assert!(service.get_config().providers.is_empty());
    assert_eq!(service.get_config().search_provider, "duckduckgo");
    assert!(matches!(service.provider(None), Err(AdvisorError::Config(_))));
}

#[test]
fn test_default_provider_is_used_when_none_named() {
    let temp = tempfile::tempdir().unwrap();
    let service = ConfigService::open(write_config(temp.path(), "none")).unwrap();

    assert_eq!(service.provider(None).unwrap().name, "local");
    assert_eq!(service.provider(Some("picky")).unwrap().model, "offtopic-vision");
    assert!(service.provider(Some("missing")).is_err());
}

#[tokio::test]
async fn test_pipeline_built_from_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let service = ConfigService::open(write_config(temp.path(), "none")).unwrap();
    let provider = service.provider(None).unwrap().clone();

    let orchestrator =
        AnalysisOrchestrator::from_config(service.get_config(), &provider, &fake_registry())
            .unwrap();
    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();

    assert!(rec.analysis.contains("- Learn the attack pattern"));
    assert!(!rec.analysis.contains("## Research"));

    let cached = std::fs::read_dir(temp.path().join("cache")).unwrap().count();
    assert_eq!(cached, 1);
}

#[tokio::test]
async fn test_configured_threshold_rejects() {
    let temp = tempfile::tempdir().unwrap();
    let service = ConfigService::open(write_config(temp.path(), "none")).unwrap();
    let provider = service.provider(Some("picky")).unwrap().clone();

    let orchestrator =
        AnalysisOrchestrator::from_config(service.get_config(), &provider, &fake_registry())
            .unwrap();
    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();
    assert!(rec.is_rejected());
}

#[test]
fn test_keyed_search_backend_without_key_fails_fast() {
    let temp = tempfile::tempdir().unwrap();
    let service = ConfigService::open(write_config(temp.path(), "tavily")).unwrap();
    let provider = service.provider(None).unwrap().clone();

    let err = AnalysisOrchestrator::from_config(service.get_config(), &provider, &fake_registry())
        .err()
        .unwrap();
    assert!(matches!(err, AdvisorError::Config(_)));
}
