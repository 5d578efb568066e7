//! Analysis Pipeline Integration Tests
//!
//! Runs the orchestrator end to end against fake providers:
//! - Full pipeline with research and rule injection
//! - Degraded research (failed fetches, failed search)
//! - Low-relevance rejection
//! - Provider failures with stage attribution
//! - Article fan-out ordering and cancellation
//! - Cancellation, caching, and provider resolution failures

use std::io::Cursor;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use game_advisor::services::analysis::{
    AnalysisOrchestrator, AnalyzeOptions, ProgressTracker, WatchProgressSink,
};
use game_advisor::services::cache::{FileResultCache, ResultCache};
use game_advisor::services::imaging::prepare_for_provider;
use game_advisor::services::research::RESEARCH_JOB;
use game_advisor::services::rules::RuleInjector;
use game_advisor_core::{
    AdvisorError, AnalysisRequest, ImageData, JobStatus, Priority, ResearchMode, Stage,
};
use game_advisor_llm::{ProviderConfiguration, ProviderKind, ProviderRegistry};
use image::{DynamicImage, ImageFormat, RgbImage};
use tokio_util::sync::CancellationToken;

use super::support::*;

// ============================================================================
// Full Pipeline
// ============================================================================

#[tokio::test]
async fn test_full_pipeline_with_research_and_rules() {
    let rules_dir = tempfile::tempdir().unwrap();
    write_rule(rules_dir.path(), "elden-ring/bosses.json", BOSS_RULES);

    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("vision")
        .with_research(gatherer(false, Arc::new(StaticFetcher), ResearchMode::FullArticle))
        .with_rules(RuleInjector::new(rules_dir.path()), vec!["bosses".to_string()])
        .with_progress_sink(Arc::new(sink));

    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!rec.is_rejected());
    assert_eq!(rec.provider_name, "fake");
    assert_eq!(rec.recommendations.len(), 1);
    assert_eq!(rec.recommendations[0].priority, Priority::High);
    assert!(rec.analysis.contains("## Screenshot Description"));
    assert!(rec.analysis.contains("Full article text from https://example.com/guide/0"));
    assert!(rec.analysis.contains("## Game Rules"));
    assert!(rec.analysis.contains("- Learn the attack pattern"));
    assert!(rec.analysis.contains("How do I beat this boss?"));

    let snapshot = progress.borrow().clone();
    assert!(snapshot.is_finished());
    assert_eq!(snapshot.total_percentage(), 100.0);
    let tags: Vec<&str> = snapshot.jobs().iter().map(|j| j.tag.as_str()).collect();
    assert_eq!(
        tags,
        vec!["describe", "article-1", "article-2", "article-3", "research", "rules", "synthesize"]
    );
}

#[tokio::test]
async fn test_summary_mode_uses_snippets() {
    let orchestrator = orchestrator("vision").with_research(gatherer(
        false,
        Arc::new(FailingFetcher),
        ResearchMode::SummaryOnly,
    ));

    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();

    assert!(rec.analysis.contains("## Research"));
    assert!(rec.analysis.contains("Snippet 0: stay behind the boss"));
}

// ============================================================================
// Degraded Research
// ============================================================================

#[tokio::test]
async fn test_failed_fetches_fall_back_to_snippets() {
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("vision")
        .with_research(gatherer(false, Arc::new(FailingFetcher), ResearchMode::FullArticle))
        .with_progress_sink(Arc::new(sink));

    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!rec.is_rejected());
    for i in 0..3 {
        assert!(rec.analysis.contains(&format!("Snippet {}: stay behind the boss", i)));
    }

    let snapshot = progress.borrow().clone();
    for i in 1..=3 {
        let job = snapshot.job(&format!("article-{}", i)).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }
    assert_eq!(snapshot.job("research").unwrap().status, JobStatus::Completed);
    assert_eq!(snapshot.total_percentage(), 100.0);
}

#[tokio::test]
async fn test_search_failure_degrades_to_no_research() {
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("vision")
        .with_research(gatherer(true, Arc::new(StaticFetcher), ResearchMode::SummaryOnly))
        .with_progress_sink(Arc::new(sink));

    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!rec.analysis.contains("## Research"));
    let snapshot = progress.borrow().clone();
    assert_eq!(snapshot.job("research").unwrap().status, JobStatus::Failed);
    assert_eq!(snapshot.job("synthesize").unwrap().status, JobStatus::Completed);
}

// ============================================================================
// Provider Failures
// ============================================================================

#[tokio::test]
async fn test_description_failure_aborts_with_stage() {
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("describe-fail-vision")
        .with_research(gatherer(false, Arc::new(StaticFetcher), ResearchMode::FullArticle))
        .with_progress_sink(Arc::new(sink));

    let err = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::ImageDescription));
    assert_eq!(err.exit_code(), 4);

    let snapshot = progress.borrow().clone();
    assert_eq!(snapshot.job("describe").unwrap().status, JobStatus::Failed);
    assert_eq!(snapshot.job("research").unwrap().status, JobStatus::Pending);
    assert!(snapshot.job("article-1").is_none());
}

#[tokio::test]
async fn test_synthesis_failure_aborts_with_stage() {
    let cache_dir = tempfile::tempdir().unwrap();
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("synth-fail-vision")
        .with_cache(Arc::new(FileResultCache::new(cache_dir.path())))
        .with_progress_sink(Arc::new(sink));

    let err = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Synthesis));

    let snapshot = progress.borrow().clone();
    assert_eq!(snapshot.job("describe").unwrap().status, JobStatus::Completed);
    assert_eq!(snapshot.job("synthesize").unwrap().status, JobStatus::Failed);
    assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unparseable_recommendation_is_not_retried() {
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("bad-priority-vision").with_progress_sink(Arc::new(sink));

    let err = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisorError::Parse(ref m) if m.contains("urgent")));
    assert_eq!(BAD_PRIORITY_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(
        progress.borrow().job("synthesize").unwrap().status,
        JobStatus::Failed
    );
}

// ============================================================================
// Article Fan-out
// ============================================================================

#[tokio::test]
async fn test_articles_keep_ranking_order_when_completing_out_of_order() {
    let gatherer = gatherer(
        false,
        Arc::new(ReverseTimedFetcher),
        ResearchMode::FullArticle,
    );
    let mut tracker = ProgressTracker::detached();
    tracker.add_job(RESEARCH_JOB, "Research").unwrap();
    tracker.start(RESEARCH_JOB).unwrap();

    let results = gatherer
        .research(
            &request(Some("Elden Ring")),
            "A boss arena.",
            ResearchMode::FullArticle,
            &mut tracker,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["article 0", "article 1", "article 2"]);
    let scores: Vec<f64> = results.iter().map(|r| r.relevance_score).collect();
    assert!(scores.windows(2).all(|w| w[0] > w[1]));

    let tags: Vec<&str> = tracker.progress().jobs().iter().map(|j| j.tag.as_str()).collect();
    assert_eq!(tags, vec!["article-1", "article-2", "article-3", "research"]);
}

#[tokio::test]
async fn test_cancellation_during_article_fetches_is_not_degraded() {
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("vision")
        .with_research(gatherer(false, Arc::new(HangingFetcher), ResearchMode::FullArticle))
        .with_progress_sink(Arc::new(sink));
    let cancel = CancellationToken::new();

    let mut watcher = progress.clone();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        // Cancel once the article jobs exist
        while watcher.changed().await.is_ok() {
            if watcher.borrow().job("article-1").is_some() {
                trigger.cancel();
                break;
            }
        }
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.analyze(request(Some("Elden Ring")), &cancel),
    )
    .await
    .expect("cancellation should end the fan-out promptly")
    .unwrap_err();
    assert!(matches!(err, AdvisorError::Cancelled));

    let snapshot = progress.borrow().clone();
    assert_eq!(snapshot.job("research").unwrap().status, JobStatus::InProgress);
    assert_eq!(snapshot.job("synthesize").unwrap().status, JobStatus::Pending);
}

// ============================================================================
// Relevance Gate
// ============================================================================

#[tokio::test]
async fn test_low_relevance_is_rejected_before_research() {
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("offtopic-vision")
        .with_research(gatherer(false, Arc::new(StaticFetcher), ResearchMode::FullArticle))
        .with_progress_sink(Arc::new(sink));

    let rec = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap();

    assert!(rec.is_rejected());
    assert!(rec.recommendations.is_empty());
    assert!(rec.summary.contains("Elden Ring"));

    let snapshot = progress.borrow().clone();
    assert!(snapshot.is_finished());
    assert!(snapshot.job("article-1").is_none());
    assert!(snapshot.job("research").unwrap().name.ends_with("(skipped)"));
    assert!(snapshot.job("synthesize").unwrap().name.ends_with("(skipped)"));
}

// ============================================================================
// Rules
// ============================================================================

#[tokio::test]
async fn test_no_domain_matches_run_without_rules() {
    let rules_dir = tempfile::tempdir().unwrap();
    write_rule(rules_dir.path(), "bosses.json", BOSS_RULES);

    let with_rules = orchestrator("vision")
        .with_rules(RuleInjector::new(rules_dir.path()), vec!["bosses".to_string()]);
    let without_rules = orchestrator("vision");

    let cancel = CancellationToken::new();
    let a = with_rules.analyze(request(None), &cancel).await.unwrap();
    let b = without_rules.analyze(request(None), &cancel).await.unwrap();

    assert!(!a.analysis.contains("## Game Rules"));
    assert_eq!(a.analysis, b.analysis);
}

#[tokio::test]
async fn test_missing_rule_file_aborts() {
    let rules_dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator("vision")
        .with_rules(RuleInjector::new(rules_dir.path()), vec!["nope.json".to_string()]);

    let err = orchestrator
        .analyze(request(Some("Elden Ring")), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisorError::MissingRuleFile(ref n) if n == "nope.json"));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancellation_during_description() {
    let orchestrator = orchestrator("slow-vision");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.analyze(request(Some("Elden Ring")), &cancel),
    )
    .await
    .expect("cancellation should end the run promptly")
    .unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_already_cancelled_token() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = orchestrator("vision")
        .analyze(request(None), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisorError::Cancelled));
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(FileResultCache::new(cache_dir.path()));
    let (sink, progress) = WatchProgressSink::channel();
    let orchestrator = orchestrator("vision")
        .with_cache(cache.clone())
        .with_progress_sink(Arc::new(sink));
    let cancel = CancellationToken::new();

    let first = orchestrator.analyze(request(Some("Elden Ring")), &cancel).await.unwrap();
    let second = orchestrator.analyze(request(Some("Elden Ring")), &cancel).await.unwrap();
    assert_eq!(first.timestamp, second.timestamp);

    // The hit still reports a finished run
    let snapshot = progress.borrow().clone();
    let tags: Vec<&str> = snapshot.jobs().iter().map(|j| j.tag.as_str()).collect();
    assert_eq!(tags, vec!["cache"]);
    assert_eq!(snapshot.job("cache").unwrap().status, JobStatus::Completed);
    assert_eq!(snapshot.total_percentage(), 100.0);

    let fresh = orchestrator
        .analyze_with(
            request(Some("Elden Ring")),
            AnalyzeOptions { bypass_cache: true },
            &cancel,
        )
        .await
        .unwrap();
    assert_ne!(fresh.timestamp, first.timestamp);

    let entries = std::fs::read_dir(cache_dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_different_domain_misses_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let cache: Arc<dyn ResultCache> = Arc::new(FileResultCache::new(cache_dir.path()));
    let orchestrator = orchestrator("vision").with_cache(cache);
    let cancel = CancellationToken::new();

    orchestrator.analyze(request(Some("Elden Ring")), &cancel).await.unwrap();
    orchestrator.analyze(request(Some("Dark Souls")), &cancel).await.unwrap();

    let entries = std::fs::read_dir(cache_dir.path()).unwrap().count();
    assert_eq!(entries, 2);
}

// ============================================================================
// Images
// ============================================================================

fn bmp_image() -> ImageData {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(4, 4))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp)
        .unwrap();
    ImageData::new(bytes, "image/bmp").unwrap()
}

#[test]
fn test_bmp_is_converted_to_png() {
    let converted = prepare_for_provider(bmp_image()).unwrap();
    assert_eq!(converted.mime_type(), "image/png");
    assert_eq!(&converted.bytes()[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[tokio::test]
async fn test_provider_receives_png_for_bmp_input() {
    let request = AnalysisRequest::new(bmp_image(), "What now?", None).unwrap();
    let rec = orchestrator("vision")
        .analyze(request, &CancellationToken::new())
        .await
        .unwrap();
    assert!(rec.analysis.contains("(image/png)"));
}

// ============================================================================
// Provider Resolution
// ============================================================================

#[test]
fn test_unregistered_kind_is_configuration_error() {
    let err = AnalysisOrchestrator::new(&ProviderRegistry::new(), &fake_provider("vision"))
        .err()
        .unwrap();
    assert!(matches!(err, AdvisorError::Config(_)));
}

#[test]
fn test_remote_provider_without_key_is_configuration_error() {
    let config = ProviderConfiguration::new("gpt", ProviderKind::OpenAI, "gpt-4o");
    let err = AnalysisOrchestrator::new(&ProviderRegistry::with_defaults(), &config)
        .err()
        .unwrap();
    assert!(matches!(err, AdvisorError::Config(_)));
    assert_eq!(err.exit_code(), 3);
}
