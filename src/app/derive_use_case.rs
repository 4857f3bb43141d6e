use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::app::ports::{IndicatorOutputPort, RecordSourcePort, ReportOutputPort};
use crate::config::PipelineConfig;
use crate::domain::{CanonicalRecord, IndicatorRecord};
use crate::pipeline::orchestrator;
use crate::pipeline::quality_report::QualityReport;

#[derive(Debug)]
pub struct DeriveOutcome {
    pub indicators: Vec<IndicatorRecord>,
    pub report: QualityReport,
}

/// Use case for computing indicator tables from a validated dataset
pub struct DeriveUseCase {
    config: Arc<PipelineConfig>,
    records_source: Box<dyn RecordSourcePort>,
    indicator_output: Box<dyn IndicatorOutputPort>,
    report_output: Box<dyn ReportOutputPort>,
}

impl DeriveUseCase {
    pub fn new(
        config: Arc<PipelineConfig>,
        records_source: Box<dyn RecordSourcePort>,
        indicator_output: Box<dyn IndicatorOutputPort>,
        report_output: Box<dyn ReportOutputPort>,
    ) -> Self {
        Self {
            config,
            records_source,
            indicator_output,
            report_output,
        }
    }

    /// Compute indicators from the clean records a previous ingest left behind. The
    /// existing quality report is extended; a fresh one is started when none exists.
    pub async fn execute_from_store(&self, run_id: &str) -> Result<DeriveOutcome> {
        let records = self.records_source.read_clean_records().await?;
        let report = self
            .report_output
            .read_quality_report()
            .await?
            .unwrap_or_else(|| QualityReport::new(run_id));
        info!(records = records.len(), run_id = %report.run_id, "Loaded clean records");
        self.execute(records, report).await
    }

    pub async fn execute(&self, records: Vec<CanonicalRecord>, mut report: QualityReport) -> Result<DeriveOutcome> {
        let output = orchestrator::derive(records, Arc::clone(&self.config)).await?;
        report.add_indicator_diagnostics(&output.diagnostics, output.records.len());

        self.indicator_output.write_indicators(&output.records).await?;
        self.report_output.write_decompositions(&output.decompositions).await?;
        self.report_output.write_growth_summaries(&output.growth_summaries).await?;
        self.report_output.write_quality_report(&report).await?;

        info!(
            indicators = output.records.len(),
            decompositions = output.decompositions.len(),
            conflicts = report.conflicts_resolved,
            skipped = report.skipped_groups.len(),
            "Derive complete"
        );

        Ok(DeriveOutcome {
            indicators: output.records,
            report,
        })
    }
}
