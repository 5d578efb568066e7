//! Game Advisor - Command Line Entry Point
//!
//! `game-advisor analyze` runs one screenshot through the pipeline and prints
//! the recommendation as JSON. `game-advisor providers` lists the configured
//! LLM endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use game_advisor::services::analysis::LogProgressSink;
use game_advisor::{
    AdvisorConfig, AdvisorResult, AnalysisOrchestrator, AnalysisRequest,
    AnalyzeOptions, ConfigService, ImageData, ResearchMode,
};
use game_advisor_llm::ProviderRegistry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "game-advisor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Screenshot-driven game advice from vision LLMs", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.game-advisor/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a screenshot and print a recommendation
    Analyze {
        /// Screenshot file
        #[arg(short, long)]
        image: PathBuf,

        /// Question to answer about the screenshot
        #[arg(short, long)]
        prompt: String,

        /// Configured provider name
        #[arg(long)]
        provider: Option<String>,

        /// Game name; enables relevance checking against it and rule injection
        #[arg(short, long)]
        domain: Option<String>,

        /// Rule file to inject (repeatable, replaces the configured list)
        #[arg(long = "rule-file")]
        rule_files: Vec<String>,

        /// Research mode override
        #[arg(long, value_enum)]
        research: Option<ResearchArg>,

        /// Ignore cached results and do not store this one
        #[arg(long)]
        no_cache: bool,
    },

    /// List configured providers
    Providers,
}

#[derive(Clone, Copy, ValueEnum)]
enum ResearchArg {
    Off,
    Summary,
    Full,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("game-advisor error: {}", err);
            err.exit_code()
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "game_advisor=debug,game_advisor_llm=debug"
    } else {
        "game_advisor=info,game_advisor_llm=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn open_config(path: Option<&Path>) -> AdvisorResult<ConfigService> {
    match path {
        Some(path) => ConfigService::open(path),
        None => ConfigService::new(),
    }
}

async fn run(cli: Cli) -> AdvisorResult<()> {
    let config_service = open_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Providers => {
            let config = config_service.get_config();
            for provider in &config.providers {
                let marker = match config.default_provider.as_deref() {
                    Some(name) if name == provider.name => " (default)",
                    _ => "",
                };
                println!(
                    "{}\t{}\t{}{}",
                    provider.name, provider.kind, provider.model, marker
                );
            }
            Ok(())
        }
        Commands::Analyze {
            image,
            prompt,
            provider,
            domain,
            rule_files,
            research,
            no_cache,
        } => {
            let mut config = config_service.get_config().clone();
            apply_overrides(&mut config, rule_files, research);
            let provider_config = config_service.provider(provider.as_deref())?.clone();

            let registry = ProviderRegistry::with_defaults();
            let orchestrator =
                AnalysisOrchestrator::from_config(&config, &provider_config, &registry)?
                    .with_progress_sink(Arc::new(LogProgressSink));

            let bytes = tokio::fs::read(&image).await?;
            let image_data = ImageData::from_bytes(bytes, image.to_str())?;
            let request = AnalysisRequest::new(image_data, prompt, domain)?;

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupted, cancelling analysis");
                    ctrl_c_token.cancel();
                }
            });

            let options = AnalyzeOptions {
                bypass_cache: no_cache,
            };
            let recommendation = orchestrator.analyze_with(request, options, &cancel).await?;

            let json = serde_json::to_string_pretty(&recommendation)?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn apply_overrides(
    config: &mut AdvisorConfig,
    rule_files: Vec<String>,
    research: Option<ResearchArg>,
) {
    if !rule_files.is_empty() {
        config.rule_files = rule_files;
    }
    match research {
        Some(ResearchArg::Off) => config.search_provider = "none".to_string(),
        Some(ResearchArg::Summary) => config.research.mode = ResearchMode::SummaryOnly,
        Some(ResearchArg::Full) => config.research.mode = ResearchMode::FullArticle,
        None => {}
    }
}

