use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use ecomap::app::derive_use_case::DeriveUseCase;
use ecomap::app::ingest_use_case::IngestUseCase;
use ecomap::app::report_use_case::ReportUseCase;
use ecomap::config::PipelineConfig;
use ecomap::infra::csv_output_adapter::FileCsvOutputAdapter;
use ecomap::infra::json_output_adapter::FileReportOutputAdapter;
use ecomap::observability::{self, metrics};

#[derive(Parser)]
#[command(name = "ecomap")]
#[command(about = "Regional economic data harmonization and indicator pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration (defaults to $ECOMAP_CONFIG, then ./ecomap.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Raise the default log level to debug
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harmonize and validate the configured sources
    Ingest,
    /// Compute indicators from the validated dataset
    Derive,
    /// Build indicator tables and summary statistics
    Report,
    /// Run ingest, derive and report in sequence
    Run,
}

fn csv_adapter(config: &PipelineConfig) -> Result<Box<FileCsvOutputAdapter>> {
    Ok(Box::new(FileCsvOutputAdapter::new(&config.output.directory)?))
}

fn json_adapter(config: &PipelineConfig) -> Result<Box<FileReportOutputAdapter>> {
    Ok(Box::new(FileReportOutputAdapter::new(&config.output.directory)?))
}

fn ingest_use_case(config: &Arc<PipelineConfig>) -> Result<IngestUseCase> {
    Ok(IngestUseCase::with_default_quality_gate(
        Arc::clone(config),
        csv_adapter(config)?,
        json_adapter(config)?,
    ))
}

fn derive_use_case(config: &Arc<PipelineConfig>) -> Result<DeriveUseCase> {
    Ok(DeriveUseCase::new(
        Arc::clone(config),
        csv_adapter(config)?,
        csv_adapter(config)?,
        json_adapter(config)?,
    ))
}

fn report_use_case(config: &PipelineConfig) -> Result<ReportUseCase> {
    Ok(ReportUseCase::new(
        config.indicators.top_n,
        csv_adapter(config)?,
        csv_adapter(config)?,
        json_adapter(config)?,
    ))
}

async fn execute(command: Commands, config: Arc<PipelineConfig>) -> Result<()> {
    let run_id = uuid::Uuid::new_v4().to_string();
    info!(run_id = %run_id, output = %config.output.directory.display(), "Starting run");

    match command {
        Commands::Ingest => {
            println!("📥 Ingesting sources...");
            let outcome = ingest_use_case(&config)?.execute(&run_id).await?;
            let totals = &outcome.report.totals;
            println!(
                "   Files: {} ({} failed) | Clean: {} | Rejected: {} | Quality score: {:.2}",
                totals.files_processed,
                totals.files_failed,
                totals.records_clean,
                totals.records_rejected,
                totals.quality_score
            );
        }
        Commands::Derive => {
            println!("📐 Deriving indicators...");
            let outcome = derive_use_case(&config)?.execute_from_store(&run_id).await?;
            println!(
                "   Indicator records: {} | Conflicts resolved: {} | Skipped groups: {}",
                outcome.indicators.len(),
                outcome.report.conflicts_resolved,
                outcome.report.skipped_groups.len()
            );
        }
        Commands::Report => {
            println!("📊 Building report tables...");
            let summary = report_use_case(&config)?.execute_from_store().await?;
            print_summary(&summary);
        }
        Commands::Run => {
            println!("🚀 Running full pipeline...");
            let ingested = ingest_use_case(&config)?.execute(&run_id).await?;
            let derived = derive_use_case(&config)?
                .execute(ingested.clean, ingested.report)
                .await?;
            let summary = report_use_case(&config)?
                .execute(&derived.indicators, Some(run_id.clone()))
                .await?;
            print_summary(&summary);
        }
    }

    println!("✅ Artifacts written to {}", config.output.directory.display());
    Ok(())
}

fn print_summary(summary: &ecomap::pipeline::processing::aggregate::RunSummary) {
    for indicator in &summary.indicators {
        println!(
            "   {:<12} records: {:>6} | computed: {:>6} | null: {:>6}",
            indicator.indicator_type.as_str(),
            indicator.total_records,
            indicator.computed,
            indicator.null_values
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config_path = PipelineConfig::resolve_path(cli.config.as_deref());
    let config = PipelineConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let _guard = observability::init_logging(&config.output.log_directory, cli.verbose)?;
    if let Err(e) = metrics::init() {
        error!("Failed to initialize metrics: {}", e);
    }

    let result = execute(cli.command, Arc::new(config)).await;
    if let Err(e) = &result {
        error!(error = %format!("{:#}", e), "Run failed");
    }
    result
}
