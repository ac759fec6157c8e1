mod adapters;
mod application;
mod cli;
mod config;
mod health_scoring;
mod ports;
mod shared;

use adapters::outbound::cache::SqliteCacheStore;
use adapters::outbound::console::{render_summary, StderrProgressReporter};
use adapters::outbound::network::{
    build_client, CachingCollector, GitHubClient, OsvClient, PyPiClient, PyPiStatsClient,
};
use anyhow::Context;
use application::dto::ScanResponse;
use application::use_cases::{AssessHealthUseCase, ScanPackagesUseCase};
use cli::{Args, CacheAction, Command};
use config::{discover_config, load_config_from_path, Settings, GITHUB_TOKEN_ENV};
use health_scoring::services::HealthCalculator;
use ports::outbound::{CacheStore, SourceCollector};
use shared::{ExitCode, Result};
use std::io::IsTerminal;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(code) => process::exit(code.as_i32()),
        Err(e) => {
            eprintln!("\n❌ An error occurred:\n");
            eprintln!("{}", e);

            // Display error chain
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("\nCaused by: {}", err);
                source = err.source();
            }

            eprintln!();
            process::exit(ExitCode::ApplicationError.as_i32());
        }
    }
}

/// Logs go to stderr; stdout carries only the JSON report.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,dep_health=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> Result<ExitCode> {
    let settings = load_settings(&args)?;

    match args.command {
        Command::Check {
            packages, compact, ..
        } => run_check(&packages, &settings, compact).await,
        Command::Cache { action } => run_cache(action, &settings).await,
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let file = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => discover_config(Path::new("."))?.unwrap_or_default(),
    };
    Settings::resolve(file, &args.overrides(), std::env::var(GITHUB_TOKEN_ENV).ok())
}

async fn run_check(packages: &[String], settings: &Settings, compact: bool) -> Result<ExitCode> {
    // Create adapters (Dependency Injection)
    let client = build_client(settings.request_timeout)?;
    let cache = open_cache(settings);

    let registry = cached(PyPiClient::new(client.clone()), &cache, settings.ttls.registry, settings);
    let downloads = cached(
        PyPiStatsClient::new(client.clone()),
        &cache,
        settings.ttls.downloads,
        settings,
    );
    let repository = cached(
        GitHubClient::new(client.clone(), settings.github_token.clone()),
        &cache,
        settings.ttls.repository,
        settings,
    );
    let vulnerabilities = cached(
        OsvClient::new(client),
        &cache,
        settings.ttls.vulnerabilities,
        settings,
    );

    // Create use cases with injected dependencies
    let assessor = AssessHealthUseCase::new(
        registry,
        downloads,
        repository,
        vulnerabilities,
        HealthCalculator::new(settings.weights),
    );
    let use_case = ScanPackagesUseCase::new(
        assessor,
        StderrProgressReporter::new(),
        settings.max_concurrency,
    )?;

    let response = use_case.execute(packages).await;

    let json = if compact {
        serde_json::to_string(&response)
    } else {
        serde_json::to_string_pretty(&response)
    }
    .context("Failed to serialize report")?;
    println!("{}", json);

    eprint!("{}", render_summary(&response, std::io::stderr().is_terminal()));

    Ok(exit_code_for(&response))
}

/// Rejected specifiers win over unhealthy results.
fn exit_code_for(response: &ScanResponse) -> ExitCode {
    if response.rejected_count() > 0 {
        ExitCode::InvalidArguments
    } else if response.concerning_count() > 0 {
        ExitCode::UnhealthyDependencies
    } else {
        ExitCode::Success
    }
}

/// Opens the cache for an assessment run. A cache that cannot be opened
/// only costs speed, so the run continues without one.
fn open_cache(settings: &Settings) -> Option<Arc<dyn CacheStore>> {
    if !settings.use_cache {
        return None;
    }

    match SqliteCacheStore::open(&settings.cache_path) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(
                path = %settings.cache_path.display(),
                error = %e,
                "cache unavailable, continuing without it"
            );
            None
        }
    }
}

fn cached<C: SourceCollector>(
    inner: C,
    cache: &Option<Arc<dyn CacheStore>>,
    ttl: Option<Duration>,
    settings: &Settings,
) -> CachingCollector<C> {
    let collector =
        CachingCollector::new(inner, cache.clone()).with_not_found_ttl(settings.ttls.not_found);
    match ttl {
        Some(ttl) => collector.with_ttl(ttl),
        None => collector,
    }
}

async fn run_cache(action: CacheAction, settings: &Settings) -> Result<ExitCode> {
    let store = SqliteCacheStore::open(&settings.cache_path)?;

    match action {
        CacheAction::Stats => {
            let stats = store.stats().await?;
            let json =
                serde_json::to_string_pretty(&stats).context("Failed to serialize cache stats")?;
            println!("{}", json);
        }
        CacheAction::Cleanup => {
            let removed = store.cleanup().await?;
            eprintln!("🧹 Removed {} expired cache entrie(s)", removed);
        }
        CacheAction::Clear => {
            let removed = store.clear().await?;
            eprintln!("🧹 Removed {} cache entrie(s)", removed);
        }
        CacheAction::Invalidate { pattern } => {
            let removed = store.invalidate(&pattern).await?;
            eprintln!("🧹 Removed {} cache entrie(s) matching '{}'", removed, pattern);
        }
    }

    store.close().await?;
    Ok(ExitCode::Success)
}
