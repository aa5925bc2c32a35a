//! crmforge entrypoint: HTTP server, single generation, and preference dataset runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use crmforge::cache::CachePolicy;
use crmforge::config::Config;
use crmforge::constants::DEFAULT_NUM_CANDIDATES;
use crmforge::domain::{GenerationRow, PersonaRef, parse_bool_like};
use crmforge::evaluator::{EvaluatorClient, EvaluatorConfig, Judge};
use crmforge::gateway::{HandlerState, create_router_with_state};
use crmforge::invoker::{CommandEntry, PipelineCallable, Typed};
use crmforge::pipeline::{MarketingPipeline, PreferenceDatasetBuilder, RunRequest, load_rows};
use crmforge::preference::PreferenceStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(version, about = "Persona-grounded CRM copy generation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the generation HTTP API.
    Serve,

    /// Run the pipeline once and print the record as a single JSON line.
    Generate(GenerateArgs),

    /// Build preference pairs from a CSV or JSON row file.
    Dataset(DatasetArgs),
}

#[derive(Debug, clap::Args)]
struct GenerateArgs {
    #[arg(long)]
    persona: String,
    #[arg(long)]
    brand: String,
    #[arg(long)]
    product: String,
    #[arg(long = "stage_index", visible_alias = "stage-index")]
    stage_index: i64,
    #[arg(long = "style_index", visible_alias = "style-index", default_value_t = 0)]
    style_index: i64,
    /// Boolean-like: 1/true/yes/y/t.
    #[arg(long = "is_event", visible_alias = "is-event", default_value = "0")]
    is_event: String,
    #[arg(long = "top_k", visible_alias = "top-k")]
    top_k: Option<usize>,
    #[arg(long = "drafter-model", visible_alias = "qwen_model")]
    drafter_model: Option<String>,
    #[arg(long = "corrector-model", visible_alias = "exa_model")]
    corrector_model: Option<String>,
    #[arg(long = "disable-cache", visible_alias = "disable_cache")]
    disable_cache: bool,
    /// Also write the record under the configured output directory.
    #[arg(long)]
    save: bool,
}

#[derive(Debug, clap::Args)]
struct DatasetArgs {
    /// Row file (`.json` list or CSV).
    #[arg(long, value_name = "FILE")]
    rows: PathBuf,
    /// Preference-pair JSON file, appended to when it exists.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
    #[arg(long, value_name = "N")]
    max_rows: Option<usize>,
    #[arg(long, value_name = "N", default_value_t = DEFAULT_NUM_CANDIDATES)]
    num_candidates: usize,
    /// Run an external program per candidate instead of the in-process pipeline.
    #[arg(long, value_name = "PROGRAM")]
    legacy_command: Option<PathBuf>,
    /// Arguments placed before the row arguments of the legacy command.
    #[arg(long = "legacy-arg", value_name = "ARG", requires = "legacy_command")]
    legacy_args: Vec<String>,
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    legacy_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.validate()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Generate(args) => generate(config, args).await,
        Command::Dataset(args) => dataset(config, args).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config.socket_addr().parse()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        cache_enabled = config.cache_enabled,
        "crmforge starting"
    );

    let pipeline = Arc::new(MarketingPipeline::from_config(&config)?);
    let app = create_router_with_state(HandlerState::new(pipeline));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("crmforge shutdown complete");
    Ok(())
}

async fn generate(config: Config, args: GenerateArgs) -> anyhow::Result<()> {
    let pipeline = MarketingPipeline::from_config(&config)?;
    let request = RunRequest {
        row: GenerationRow {
            persona: PersonaRef::parse(&args.persona),
            brand: args.brand,
            product: args.product,
            stage_index: args.stage_index,
            style_index: args.style_index,
            is_event: parse_bool_like(&args.is_event),
        },
        top_k: args.top_k,
        drafter_model: args.drafter_model,
        corrector_model: args.corrector_model,
        cache: args.disable_cache.then_some(CachePolicy::Bypass),
    };

    let record = pipeline.execute(&request).await?;
    if args.save {
        pipeline.save_record(&record, &config.output_dir).await?;
    }

    // Last stdout line is the result; the legacy argv shim parses it.
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

async fn dataset(config: Config, args: DatasetArgs) -> anyhow::Result<()> {
    let rows = load_rows(&args.rows)?;
    tracing::info!(rows = rows.len(), path = %args.rows.display(), "rows loaded");

    let target: Arc<dyn PipelineCallable> = match args.legacy_command {
        Some(program) => {
            tracing::info!(program = %program.display(), "using legacy command entry point");
            Arc::new(
                CommandEntry::new(program)
                    .with_leading_args(args.legacy_args)
                    .with_timeout(Duration::from_secs(args.legacy_timeout_secs)),
            )
        }
        None => Arc::new(Typed(Arc::new(MarketingPipeline::from_config(&config)?))),
    };
    let judge: Arc<dyn Judge> = Arc::new(EvaluatorClient::new(EvaluatorConfig::from_env()?)?);

    let builder =
        PreferenceDatasetBuilder::new(target, judge).with_num_candidates(args.num_candidates);
    let store = PreferenceStore::new(args.output);
    let report = builder.run(&rows, &store, args.max_rows).await?;

    tracing::info!(
        rows_seen = report.rows_seen,
        rows_succeeded = report.rows_succeeded,
        records_added = report.records_added,
        total_records = report.total_records,
        "dataset run complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
