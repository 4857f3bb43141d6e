use std::sync::Arc;

use anyhow::Result;
use tracing::{info, info_span};

use crate::app::ports::{RecordOutputPort, ReportOutputPort};
use crate::config::PipelineConfig;
use crate::domain::CanonicalRecord;
use crate::pipeline::orchestrator;
use crate::pipeline::processing::quality_gate::{DefaultQualityGate, QualityGate, QualityGateConfig};
use crate::pipeline::quality_report::QualityReport;

/// Result of an ingest run: the clean dataset and the report built so far.
#[derive(Debug)]
pub struct IngestOutcome {
    pub clean: Vec<CanonicalRecord>,
    pub report: QualityReport,
}

/// Use case for harmonizing the configured sources and validating the result
pub struct IngestUseCase {
    config: Arc<PipelineConfig>,
    quality_gate: Box<dyn QualityGate + Send + Sync>,
    records_output: Box<dyn RecordOutputPort>,
    report_output: Box<dyn ReportOutputPort>,
}

impl IngestUseCase {
    pub fn new(
        config: Arc<PipelineConfig>,
        quality_gate: Box<dyn QualityGate + Send + Sync>,
        records_output: Box<dyn RecordOutputPort>,
        report_output: Box<dyn ReportOutputPort>,
    ) -> Self {
        Self {
            config,
            quality_gate,
            records_output,
            report_output,
        }
    }

    /// Create a use case with the default quality gate
    pub fn with_default_quality_gate(
        config: Arc<PipelineConfig>,
        records_output: Box<dyn RecordOutputPort>,
        report_output: Box<dyn ReportOutputPort>,
    ) -> Self {
        let gate = DefaultQualityGate::new(QualityGateConfig::from_pipeline_config(&config));
        Self::new(config, Box::new(gate), records_output, report_output)
    }

    /// Discover, harmonize and validate every source file, then persist clean and
    /// rejected records and the quality report.
    pub async fn execute(&self, run_id: &str) -> Result<IngestOutcome> {
        let files = orchestrator::discover(&self.config)?;
        let harmonized = orchestrator::harmonize_all(files, Arc::clone(&self.config)).await?;

        let mut report = QualityReport::new(run_id);
        report.add_sources(harmonized.sources);

        let outcome = {
            let _span = info_span!("validate", records = harmonized.records.len()).entered();
            self.quality_gate.validate(harmonized.records)
        };
        report.add_validation(&outcome);

        self.records_output.write_clean_records(&outcome.clean).await?;
        self.records_output.write_rejected_records(&outcome.rejected).await?;
        self.report_output.write_quality_report(&report).await?;

        info!(
            files = report.totals.files_processed,
            failed = report.totals.files_failed,
            clean = report.totals.records_clean,
            rejected = report.totals.records_rejected,
            quality_score = report.totals.quality_score,
            "Ingest complete"
        );

        Ok(IngestOutcome {
            clean: outcome.clean,
            report,
        })
    }
}
