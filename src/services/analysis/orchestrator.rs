//! Analysis Orchestrator
//!
//! Sequences one analysis run: validate, consult the cache, describe the
//! screenshot, short-circuit on low relevance, research, inject rules,
//! synthesize, and store the result. Progress is reported after every
//! stage transition and every network-bound step observes the
//! cancellation token.

use std::sync::Arc;

use game_advisor_core::{
    AdvisorError, AdvisorResult, AnalysisRequest, ProgressSink, Recommendation, ResearchMode,
    ResearchResult, Stage,
};
use game_advisor_llm::{LlmProvider, ProviderConfiguration, ProviderRegistry};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::describer::ImageDescriber;
use super::progress::{NoopProgressSink, ProgressTracker};
use super::prompts::DEFAULT_DOMAIN;
use super::synthesizer::RecommendationSynthesizer;
use crate::models::settings::AdvisorConfig;
use crate::services::cache::{cache_key, FileResultCache, ResultCache};
use crate::services::cancellation::check_cancelled;
use crate::services::imaging::prepare_for_provider;
use crate::services::research::{
    ResearchGatherer, WebFetchService, WebSearchService, RESEARCH_JOB,
};
use crate::services::rules::RuleInjector;

pub const CACHE_JOB: &str = "cache";
pub const DESCRIBE_JOB: &str = "describe";
pub const RULES_JOB: &str = "rules";
pub const SYNTHESIZE_JOB: &str = "synthesize";

/// Per-call switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzeOptions {
    /// Skip both the cache lookup and the cache write
    pub bypass_cache: bool,
}

pub struct AnalysisOrchestrator {
    provider_config: ProviderConfiguration,
    provider: Arc<dyn LlmProvider>,
    research: Option<ResearchGatherer>,
    rules: Option<RuleInjector>,
    rule_files: Vec<String>,
    relevance_threshold: f64,
    cache: Option<Arc<dyn ResultCache>>,
    progress_sink: Arc<dyn ProgressSink>,
}

impl AnalysisOrchestrator {
    /// Resolve and bind `provider_config`. Fails before any network call when
    /// the kind is unknown or a required API key is missing.
    pub fn new(
        registry: &ProviderRegistry,
        provider_config: &ProviderConfiguration,
    ) -> AdvisorResult<Self> {
        let handle = registry
            .resolve(provider_config)
            .map_err(|e| e.into_advisor(Stage::Validation))?;
        let provider = registry
            .bind(&handle)
            .map_err(|e| e.into_advisor(Stage::Validation))?;

        Ok(Self {
            provider_config: provider_config.clone(),
            provider,
            research: None,
            rules: None,
            rule_files: Vec::new(),
            relevance_threshold: 0.0,
            cache: None,
            progress_sink: Arc::new(NoopProgressSink),
        })
    }

    /// Build the full pipeline described by `config` for one provider.
    pub fn from_config(
        config: &AdvisorConfig,
        provider_config: &ProviderConfiguration,
        registry: &ProviderRegistry,
    ) -> AdvisorResult<Self> {
        config.validate().map_err(AdvisorError::config)?;
        let mut orchestrator = Self::new(registry, provider_config)?
            .with_relevance_threshold(config.relevance_threshold)
            .with_rules(RuleInjector::new(config.rules_dir()?), config.rule_files.clone());

        if config.research_enabled() {
            let search =
                WebSearchService::new(&config.search_provider, config.search_api_key.as_deref())?;
            let fetcher = Arc::new(WebFetchService::new(config.research.max_article_chars));
            orchestrator = orchestrator.with_research(ResearchGatherer::new(
                search,
                fetcher,
                config.research.clone(),
            ));
        }

        if config.cache.enabled {
            let cache = FileResultCache::new(config.cache_dir()?);
            orchestrator = orchestrator.with_cache(Arc::new(cache));
        }

        Ok(orchestrator)
    }

    pub fn with_research(mut self, gatherer: ResearchGatherer) -> Self {
        self.research = Some(gatherer);
        self
    }

    pub fn with_rules(mut self, injector: RuleInjector, rule_files: Vec<String>) -> Self {
        self.rules = Some(injector);
        self.rule_files = rule_files;
        self
    }

    pub fn with_relevance_threshold(mut self, threshold: f64) -> Self {
        self.relevance_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress_sink = sink;
        self
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_config.name
    }

    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Recommendation> {
        self.analyze_with(request, AnalyzeOptions::default(), cancel)
            .await
    }

    pub async fn analyze_with(
        &self,
        request: AnalysisRequest,
        options: AnalyzeOptions,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Recommendation> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "analysis",
            run_id = %run_id,
            provider = %self.provider_config.name
        );
        self.run(request, options, cancel).instrument(span).await
    }

    fn research_mode(&self) -> Option<ResearchMode> {
        self.research.as_ref().map(|g| g.settings().mode)
    }

    /// Rules apply only when a domain is named and files are configured.
    fn rules_apply(&self, request: &AnalysisRequest) -> bool {
        self.rules.is_some() && request.domain().is_some() && !self.rule_files.is_empty()
    }

    async fn run(
        &self,
        request: AnalysisRequest,
        options: AnalyzeOptions,
        cancel: &CancellationToken,
    ) -> AdvisorResult<Recommendation> {
        request.validate()?;
        check_cancelled(cancel)?;

        let rules_apply = self.rules_apply(&request);
        let cache_key = match (&self.cache, options.bypass_cache) {
            (Some(_), false) => Some(cache_key(
                &request,
                &self.provider_config,
                self.research_mode(),
                rules_apply,
                &self.rule_files,
            )?),
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            match cache.get(key) {
                Ok(Some(hit)) => {
                    tracing::info!("[Analysis] Cache hit {}", key);
                    let mut tracker = ProgressTracker::new(self.progress_sink.clone());
                    tracker.add_job(CACHE_JOB, "Load cached result")?;
                    tracker.start(CACHE_JOB)?;
                    tracker.complete(CACHE_JOB)?;
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("[Analysis] Cache lookup failed: {}", e),
            }
        }

        let image = prepare_for_provider(request.image().clone())?;
        let request = request.with_image(image);
        let domain = request.domain().unwrap_or(DEFAULT_DOMAIN).to_string();

        let mut tracker = ProgressTracker::new(self.progress_sink.clone());
        tracker.add_job(DESCRIBE_JOB, "Describe screenshot")?;
        if self.research.is_some() {
            tracker.add_job(RESEARCH_JOB, "Research")?;
        }
        if rules_apply {
            tracker.add_job(RULES_JOB, "Load game rules")?;
        }
        tracker.add_job(SYNTHESIZE_JOB, "Synthesize recommendation")?;

        // Describe
        tracing::info!("[Analysis] Describing screenshot for {}", domain);
        tracker.start(DESCRIBE_JOB)?;
        let describer = ImageDescriber::new(self.provider.clone());
        let description = match describer.describe(request.image(), &domain, cancel).await {
            Ok(d) => d,
            Err(e) => return fail_stage(&mut tracker, DESCRIBE_JOB, e),
        };
        tracker.complete(DESCRIBE_JOB)?;
        tracing::info!("[Analysis] Relevance {:.2}", description.relevance);

        if description.relevance < self.relevance_threshold {
            tracing::info!(
                "[Analysis] Rejected: relevance {:.2} below threshold {:.2}",
                description.relevance,
                self.relevance_threshold
            );
            for tag in [RESEARCH_JOB, RULES_JOB, SYNTHESIZE_JOB] {
                if tracker.has_job(tag) {
                    tracker.skip(tag)?;
                }
            }
            let rejected = Recommendation::rejected(
                &description.description,
                description.relevance,
                self.relevance_threshold,
                &domain,
                &self.provider_config.name,
            );
            self.store(cache_key.as_deref(), &rejected);
            return Ok(rejected);
        }

        // Research
        let research = match &self.research {
            Some(gatherer) => {
                tracker.start(RESEARCH_JOB)?;
                let mode = gatherer.settings().mode;
                match gatherer
                    .research(&request, &description.description, mode, &mut tracker, cancel)
                    .await
                {
                    Ok(results) => {
                        tracker.complete(RESEARCH_JOB)?;
                        results
                    }
                    Err(e) if degrades(&e) => {
                        tracing::warn!("[Analysis] Research failed, continuing without it: {}", e);
                        tracker.fail(RESEARCH_JOB)?;
                        Vec::<ResearchResult>::new()
                    }
                    Err(e) => return fail_stage(&mut tracker, RESEARCH_JOB, e),
                }
            }
            None => Vec::new(),
        };
        check_cancelled(cancel)?;

        // Rules
        let rule_text = match (&self.rules, rules_apply) {
            (Some(injector), true) => {
                tracker.start(RULES_JOB)?;
                match injector.render(&domain, &self.rule_files) {
                    Ok(text) => {
                        tracker.complete(RULES_JOB)?;
                        text
                    }
                    Err(e) => return fail_stage(&mut tracker, RULES_JOB, e),
                }
            }
            _ => String::new(),
        };

        // Synthesize
        tracing::info!(
            "[Analysis] Synthesizing with {} research results, rules={}",
            research.len(),
            !rule_text.is_empty()
        );
        tracker.start(SYNTHESIZE_JOB)?;
        let synthesizer = RecommendationSynthesizer::new(self.provider.clone());
        let recommendation = match synthesizer
            .synthesize(
                &description.description,
                &research,
                &rule_text,
                request.prompt(),
                cancel,
            )
            .await
        {
            Ok(r) => r,
            Err(e) => return fail_stage(&mut tracker, SYNTHESIZE_JOB, e),
        };
        tracker.complete(SYNTHESIZE_JOB)?;

        self.store(cache_key.as_deref(), &recommendation);
        tracing::info!(
            "[Analysis] Done: {} recommendations, confidence {:.2}",
            recommendation.recommendations.len(),
            recommendation.confidence
        );
        Ok(recommendation)
    }

    fn store(&self, key: Option<&str>, recommendation: &Recommendation) {
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Err(e) = cache.put(key, recommendation) {
                tracing::warn!("[Analysis] Cache write failed: {}", e);
            }
        }
    }
}

/// Research problems that leave the pipeline running.
fn degrades(err: &AdvisorError) -> bool {
    !matches!(
        err,
        AdvisorError::Cancelled | AdvisorError::Validation(_) | AdvisorError::Config(_)
    )
}

/// Mark `tag` failed and return `err`. Cancellation leaves the job as is.
fn fail_stage<T>(
    tracker: &mut ProgressTracker,
    tag: &str,
    err: AdvisorError,
) -> AdvisorResult<T> {
    if !err.is_cancelled() {
        if let Err(track_err) = tracker.fail(tag) {
            tracing::debug!("[Analysis] Could not mark {} failed: {}", tag, track_err);
        }
    }
    Err(err)
}
