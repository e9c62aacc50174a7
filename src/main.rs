use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use sms_annotate::config::RunConfig;
use sms_annotate::pipeline::engine::{OverlapPolicy, TriageEngine};
use sms_annotate::pipeline::processor::Annotator;
use sms_annotate::pipeline::scores::PrecomputedEnsemble;
use sms_annotate::pipeline::thresholds::Thresholds;
use sms_annotate::store::{CsvStore, RecordSource, TableSink, WarehouseStore};

/// Triage scored voter-outreach SMS conversations into tripler,
/// opt-out, and manual-review tables.
#[derive(Parser)]
#[command(name = "sms-annotate")]
#[command(about = "Triage scored voter-outreach SMS conversations", long_about = None)]
#[command(version)]
struct Args {
    /// Location of the home directory
    #[arg(short = 'f', long, default_value = ".")]
    home_folder: PathBuf,

    /// Warehouse database file
    #[arg(short = 'd', long, default_value = "vote_tripling.db")]
    database: String,

    /// Name of the aggregated, scored message file
    #[arg(short = 'i', long, default_value = "testdata_aggregated.csv")]
    input: String,

    /// File name to dump triplers
    #[arg(short = 'o', long, default_value = "sms_triplers.csv")]
    output: String,

    /// File name to dump opt-outs
    #[arg(short = 'n', long, default_value = "sms_opt_outs.csv")]
    optouts: String,

    /// File name to dump manual review
    #[arg(short = 'm', long, default_value = "sms_manual_review.csv")]
    manual_review: String,

    /// Use the warehouse database for input and output
    #[arg(short = 'c', long)]
    warehouse: bool,

    /// Probability below which a signal is confidently absent
    #[arg(long, default_value_t = 0.4)]
    lower: f64,

    /// Tie-break cut for best-guess labels in the review table
    #[arg(long, default_value_t = 0.5)]
    mid: f64,

    /// Probability at or above which a signal is confidently present
    #[arg(long, default_value_t = 0.75)]
    upper: f64,

    /// Collapse duplicate manual-review rows by conversation id
    #[arg(long)]
    dedupe_review: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let thresholds = Thresholds::new(args.lower, args.mid, args.upper)?;
    let policy = if args.dedupe_review {
        OverlapPolicy::DedupeReview
    } else {
        OverlapPolicy::Preserve
    };
    let config = RunConfig {
        home: args.home_folder,
        input: args.input,
        triplers_out: args.output,
        optouts_out: args.optouts,
        review_out: args.manual_review,
        database: args.database,
        use_warehouse: args.warehouse,
    };

    let annotator = Annotator::new(
        Arc::new(PrecomputedEnsemble),
        TriageEngine::new(thresholds, policy),
    );

    if config.use_warehouse {
        let store = WarehouseStore::open(&config).await?;
        run(&store, &store, &annotator).await
    } else {
        let store = CsvStore::new(&config);
        run(&store, &store, &annotator).await
    }
}

/// Load, annotate, persist. Generic over the I/O seam so both backends
/// drive the identical pipeline.
async fn run<S, K>(source: &S, sink: &K, annotator: &Annotator) -> anyhow::Result<()>
where
    S: RecordSource,
    K: TableSink,
{
    let conversations = source
        .load()
        .await
        .context("loading scored conversations")?;
    let output = annotator.annotate(conversations)?;
    sink.persist(&output)
        .await
        .context("persisting output tables")?;
    Ok(())
}
