//! Boardroom binary: serve stage agents and the coordinator, or run the
//! pipeline once from the terminal.
//!
//! ```bash
//! # every stage agent on its configured port
//! CEREBRAS_API_KEY=... boardroom serve-stages
//!
//! # coordinator on 127.0.0.1:8008
//! boardroom serve-coordinator
//!
//! # one run against the running stages, report on stdout
//! boardroom run "An AI tutor for high school students"
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use boardroom_core::{KnowledgeStore, StageKind, StaticKnowledgeStore};
use boardroom_runtime::providers::ApiCredential;
use boardroom_runtime::{
    coordinator_router, serve, stage_router, AgentFactory, CompletionCache, Coordinator,
    PipelineConfig, ProviderRegistry,
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "boardroom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Multi-agent business idea pipeline with provider fallback"
)]
struct Cli {
    /// YAML config file. Defaults apply when omitted.
    #[arg(long, short, global = true, env = "BOARDROOM_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve one stage agent.
    ServeStage {
        /// Stage name (concept, research, product, ...).
        stage: StageKind,

        /// Override the configured listen address.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Serve every configured stage agent from one process.
    ServeStages,

    /// Serve the pipeline coordinator.
    ServeCoordinator {
        /// Override the configured listen address.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Run the pipeline once against the configured stage agents.
    Run {
        /// Business idea to develop.
        input: String,

        /// Echoed in the report metadata.
        #[arg(long)]
        stage_count_hint: Option<u32>,
    },

    /// List configured providers and whether their key is set.
    Providers,

    /// Print the effective configuration as JSON.
    ShowConfig,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::ServeStage { stage, listen } => serve_stage(&config, stage, listen).await,
        Command::ServeStages => serve_stages(&config).await,
        Command::ServeCoordinator { listen } => serve_coordinator(&config, listen).await,
        Command::Run {
            input,
            stage_count_hint,
        } => run_once(&config, &input, stage_count_hint).await,
        Command::Providers => {
            list_providers(&config);
            Ok(())
        }
        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

// ── Stage agents ──────────────────────────────────────────────────────────────

fn agent_factory(config: &PipelineConfig) -> Result<AgentFactory> {
    let providers = config
        .build_providers(&ProviderRegistry::with_defaults())
        .context("building provider chain")?;
    let store: Arc<dyn KnowledgeStore> = Arc::new(StaticKnowledgeStore::seeded());

    let mut factory = AgentFactory::new(providers, store);
    if let Some(cache) = &config.cache {
        factory = factory.with_cache(Arc::new(CompletionCache::new(cache.max_entries, cache.ttl)));
    }
    Ok(factory)
}

async fn serve_stage(config: &PipelineConfig, kind: StageKind, listen: Option<SocketAddr>) -> Result<()> {
    let addr = match listen {
        Some(addr) => addr,
        None => config.stage(kind.name())?.socket_addr()?,
    };
    let factory = agent_factory(config)?;
    let agent = factory.build(kind)?;

    info!(stage = kind.name(), %addr, path = kind.path(), "Starting stage agent");
    serve(addr, stage_router(Arc::new(agent), factory.store()))
        .await
        .with_context(|| format!("serving stage '{}' on {addr}", kind.name()))
}

async fn serve_stages(config: &PipelineConfig) -> Result<()> {
    let factory = agent_factory(config)?;

    let mut servers = Vec::with_capacity(config.stages.len());
    for stage in &config.stages {
        let kind: StageKind = stage
            .name
            .parse()
            .with_context(|| format!("stage '{}' has no built-in agent", stage.name))?;
        let addr = stage.socket_addr()?;
        let router = stage_router(Arc::new(factory.build(kind)?), factory.store());

        info!(stage = kind.name(), %addr, "Starting stage agent");
        servers.push(async move {
            serve(addr, router)
                .await
                .with_context(|| format!("serving stage '{}' on {addr}", kind.name()))
        });
    }

    futures::future::try_join_all(servers).await?;
    Ok(())
}

// ── Coordinator ───────────────────────────────────────────────────────────────

fn coordinator(config: &PipelineConfig) -> Result<Coordinator> {
    Coordinator::builder()
        .stages(config.endpoints())
        .build()
        .context("building coordinator")
}

async fn serve_coordinator(config: &PipelineConfig, listen: Option<SocketAddr>) -> Result<()> {
    let addr = match listen {
        Some(addr) => addr,
        None => config.coordinator.socket_addr()?,
    };
    let coordinator = coordinator(config)?;

    info!(%addr, stages = coordinator.stages().len(), "Starting coordinator");
    serve(addr, coordinator_router(Arc::new(coordinator)))
        .await
        .with_context(|| format!("serving coordinator on {addr}"))
}

async fn run_once(config: &PipelineConfig, input: &str, stage_count_hint: Option<u32>) -> Result<()> {
    if input.trim().is_empty() {
        anyhow::bail!("input must not be empty");
    }
    let report = coordinator(config)?.run(input, stage_count_hint).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ── Providers ─────────────────────────────────────────────────────────────────

fn list_providers(config: &PipelineConfig) {
    for (position, provider) in config.providers.iter().enumerate() {
        let key = if ApiCredential::is_available(&provider.api_key_env) {
            "set"
        } else {
            "missing"
        };
        println!(
            "{}. {:<12} {:<12} {:<36} {} ({key}) timeout={}s",
            position + 1,
            provider.id,
            provider.kind.as_str(),
            provider.model,
            provider.api_key_env,
            provider.timeout.as_secs(),
        );
    }
}
