use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use passage_eval::{ab_test, evaluate_cases, Contender, EvalDataset};
use passage_search::{compute_adaptive_weights, compute_threshold, QueryShape, RetrievalConfig};
use serde::Serialize;
use std::io;
use std::path::PathBuf;

mod strategy;

pub use strategy::{SourceRuns, StrategySpec};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "passage")]
#[command(about = "Hybrid passage retrieval diagnostics and offline evaluation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Retrieval config file (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one strategy on a labeled dataset
    Eval(EvalArgs),

    /// Compare two strategies on a labeled dataset (A/B)
    Compare(CompareArgs),

    /// Show the adaptive similarity threshold for a query
    Threshold(ThresholdArgs),

    /// Show the adaptive fusion weights for a query
    Weights(WeightsArgs),
}

#[derive(Args)]
struct EvalArgs {
    /// Path to eval dataset JSON
    #[arg(long)]
    dataset: PathBuf,

    /// Pre-fused recorded run to evaluate
    #[arg(long, conflicts_with = "strategy")]
    run: Option<PathBuf>,

    /// Strategy: rrf|score|lexical|vector|run:<path>
    #[arg(long, default_value = "rrf")]
    strategy: StrategySpec,

    /// Recorded lexical run
    #[arg(long)]
    lexical: Option<PathBuf>,

    /// Recorded vector run
    #[arg(long)]
    vector: Option<PathBuf>,

    /// Cutoff for the @K metrics (defaults to the config's default_top_k)
    #[arg(short, long)]
    k: Option<usize>,

    /// Include per-query metrics
    #[arg(long)]
    cases: bool,
}

#[derive(Args)]
struct CompareArgs {
    /// Path to eval dataset JSON
    #[arg(long)]
    dataset: PathBuf,

    /// Baseline strategy
    #[arg(long)]
    a: StrategySpec,

    /// Candidate strategy
    #[arg(long)]
    b: StrategySpec,

    /// Recorded lexical run
    #[arg(long)]
    lexical: Option<PathBuf>,

    /// Recorded vector run
    #[arg(long)]
    vector: Option<PathBuf>,

    /// Cutoff for the @K metrics (defaults to the config's default_top_k)
    #[arg(short, long)]
    k: Option<usize>,
}

#[derive(Args)]
struct ThresholdArgs {
    query: String,

    /// Workspace offset (defaults to the config's workspace_threshold_offset)
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<f64>,
}

#[derive(Args)]
struct WeightsArgs {
    query: String,
}

#[derive(Serialize)]
struct EvalOutput {
    dataset: String,
    strategy: String,
    k: usize,
    queries: usize,
    metrics: passage_eval::MetricsResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    cases: Option<Vec<passage_eval::CaseMetrics>>,
}

#[derive(Serialize)]
struct ThresholdOutput<'a> {
    query: &'a str,
    threshold: f64,
    offset: f64,
    shape: QueryShape,
}

#[derive(Serialize)]
struct WeightsOutput<'a> {
    query: &'a str,
    weights: passage_protocol::FusionWeights,
    shape: QueryShape,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = match &cli.config {
        Some(path) => RetrievalConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RetrievalConfig::default(),
    };

    match cli.command {
        Commands::Eval(args) => run_eval(args, &config, cli.pretty).await,
        Commands::Compare(args) => run_compare(args, &config, cli.pretty).await,
        Commands::Threshold(args) => run_threshold(&args, &config, cli.pretty),
        Commands::Weights(args) => run_weights(&args, cli.pretty),
    }
}

fn dataset_label(dataset: &EvalDataset, path: &std::path::Path) -> String {
    dataset
        .name
        .clone()
        .unwrap_or_else(|| path.display().to_string())
}

async fn run_eval(args: EvalArgs, config: &RetrievalConfig, pretty: bool) -> Result<()> {
    let dataset = EvalDataset::load(&args.dataset).await?;
    let queries = dataset.queries();
    let k = args.k.unwrap_or(config.default_top_k);

    let spec = match args.run {
        Some(path) => StrategySpec::Run(path),
        None => args.strategy,
    };
    let runs = SourceRuns::load(args.lexical.as_deref(), args.vector.as_deref()).await?;
    runs.warn_unrecorded(&queries);
    let source = runs.source(&spec, config.rrf_k).await?;

    log::info!("Evaluating '{spec}' on {} queries (k={k})", queries.len());
    let report = evaluate_cases(&queries, source.as_ref(), k).await?;

    let output = EvalOutput {
        dataset: dataset_label(&dataset, &args.dataset),
        strategy: spec.to_string(),
        k: report.k,
        queries: report.queries,
        metrics: report.metrics,
        cases: args.cases.then_some(report.cases),
    };
    print_json(&output, pretty)
}

async fn run_compare(args: CompareArgs, config: &RetrievalConfig, pretty: bool) -> Result<()> {
    let dataset = EvalDataset::load(&args.dataset).await?;
    let queries = dataset.queries();
    let k = args.k.unwrap_or(config.default_top_k);

    let runs = SourceRuns::load(args.lexical.as_deref(), args.vector.as_deref()).await?;
    runs.warn_unrecorded(&queries);
    let source_a = runs.source(&args.a, config.rrf_k).await?;
    let source_b = runs.source(&args.b, config.rrf_k).await?;

    log::info!(
        "Comparing '{}' vs '{}' on {} ({} queries, k={k})",
        args.a,
        args.b,
        dataset_label(&dataset, &args.dataset),
        queries.len()
    );
    let result = ab_test(
        &queries,
        Contender::new(args.a.to_string(), source_a.as_ref()),
        Contender::new(args.b.to_string(), source_b.as_ref()),
        k,
    )
    .await?;

    print_json(&result, pretty)
}

fn run_threshold(args: &ThresholdArgs, config: &RetrievalConfig, pretty: bool) -> Result<()> {
    let offset = args.offset.unwrap_or(config.workspace_threshold_offset);
    let output = ThresholdOutput {
        query: &args.query,
        threshold: compute_threshold(&args.query, offset),
        offset,
        shape: QueryShape::of(&args.query),
    };
    print_json(&output, pretty)
}

fn run_weights(args: &WeightsArgs, pretty: bool) -> Result<()> {
    let output = WeightsOutput {
        query: &args.query,
        weights: compute_adaptive_weights(&args.query),
        shape: QueryShape::of(&args.query),
    };
    print_json(&output, pretty)
}
