//! Runs the pipeline stages: concurrent per-file harmonization, validation and
//! indicator computation.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::task::JoinSet;
use tracing::{info, info_span, Instrument};

use crate::config::PipelineConfig;
use crate::domain::CanonicalRecord;
use crate::error::EcomapError;
use crate::pipeline::ingestion::{self, SourceFile};
use crate::pipeline::processing::harmonize::mappings::MappingRegistry;
use crate::pipeline::processing::harmonize::{self, HarmonizedFile};
use crate::pipeline::processing::indicators::{self, IndicatorOutput};
use crate::pipeline::quality_report::SourceReport;

/// Harmonized records and per-file reports, both in file order.
#[derive(Debug, Default)]
pub struct HarmonizationRun {
    pub records: Vec<CanonicalRecord>,
    pub sources: Vec<SourceReport>,
}

/// Discover the configured source files; an empty result is fatal.
pub fn discover(config: &PipelineConfig) -> Result<Vec<SourceFile>> {
    let files = ingestion::discover_files(&config.sources)?;
    if files.is_empty() {
        let searched: Vec<String> = config.sources.iter().map(|s| s.path.display().to_string()).collect();
        return Err(EcomapError::NoSourceFiles(searched.join(", ")).into());
    }
    info!(files = files.len(), "Discovered source files");
    Ok(files)
}

/// Harmonize every file on its own blocking task and merge the results in file order.
///
/// Per-file failures are carried in the file's report; only a panicked task aborts
/// the run.
pub async fn harmonize_all(files: Vec<SourceFile>, config: Arc<PipelineConfig>) -> Result<HarmonizationRun> {
    let registry = Arc::new(MappingRegistry::new());
    let mut tasks: JoinSet<(usize, HarmonizedFile)> = JoinSet::new();

    for (idx, file) in files.into_iter().enumerate() {
        let config = Arc::clone(&config);
        let registry = Arc::clone(&registry);
        tasks.spawn_blocking(move || (idx, harmonize::harmonize_file(&file, &config, &registry)));
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|err| anyhow!("harmonization task join error: {err}"))?;
        results.push(result);
    }
    results.sort_by_key(|(idx, _)| *idx);

    let mut run = HarmonizationRun::default();
    for (_, harmonized) in results {
        run.records.extend(harmonized.records);
        run.sources.push(harmonized.report);
    }
    info!(
        files = run.sources.len(),
        failed = run.sources.iter().filter(|s| !s.is_ok()).count(),
        records = run.records.len(),
        "Harmonization complete"
    );
    Ok(run)
}

/// Compute indicators on a blocking task.
pub async fn derive(records: Vec<CanonicalRecord>, config: Arc<PipelineConfig>) -> Result<IndicatorOutput> {
    tokio::task::spawn_blocking(move || indicators::compute_indicators(&records, &config))
        .instrument(info_span!("derive"))
        .await
        .map_err(|err| anyhow!("indicator task join error: {err}"))
}
