use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::app::ports::{IndicatorOutputPort, IndicatorSourcePort, ReportOutputPort};
use crate::domain::IndicatorRecord;
use crate::observability::metrics;
use crate::pipeline::processing::aggregate::{self, RunSummary};

/// Use case for turning indicator records into per-type tables and summary statistics
pub struct ReportUseCase {
    top_n: usize,
    indicator_source: Box<dyn IndicatorSourcePort>,
    indicator_output: Box<dyn IndicatorOutputPort>,
    report_output: Box<dyn ReportOutputPort>,
}

impl ReportUseCase {
    pub fn new(
        top_n: usize,
        indicator_source: Box<dyn IndicatorSourcePort>,
        indicator_output: Box<dyn IndicatorOutputPort>,
        report_output: Box<dyn ReportOutputPort>,
    ) -> Self {
        Self {
            top_n,
            indicator_source,
            indicator_output,
            report_output,
        }
    }

    pub async fn execute_from_store(&self) -> Result<RunSummary> {
        let records = self.indicator_source.read_indicators().await?;
        let run_id = self
            .report_output
            .read_quality_report()
            .await?
            .map(|report| report.run_id);
        self.execute(&records, run_id).await
    }

    /// Write per-indicator tables, `summary.json` and the metrics snapshot.
    pub async fn execute(&self, records: &[IndicatorRecord], run_id: Option<String>) -> Result<RunSummary> {
        let aggregated = aggregate::aggregate(records, self.top_n);
        self.indicator_output.write_tables(&aggregated.tables).await?;

        let summary = RunSummary {
            run_id,
            generated_at: Utc::now(),
            top_n: self.top_n,
            indicators: aggregated.summaries,
        };
        self.report_output.write_summary(&summary).await?;

        match metrics::render() {
            Some(rendered) => self.report_output.write_metrics(&rendered).await?,
            None => warn!("Metrics recorder not installed; skipping metrics snapshot"),
        }

        info!(
            tables = aggregated.tables.len(),
            indicator_records = records.len(),
            "Report complete"
        );
        Ok(summary)
    }
}
