use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{CanonicalRecord, IndicatorRecord, IndicatorType};
use crate::pipeline::processing::aggregate::{IndicatorRow, RunSummary};
use crate::pipeline::processing::indicators::{DecompositionSummary, GrowthSummary};
use crate::pipeline::processing::quality_gate::RejectedRecord;
use crate::pipeline::quality_report::QualityReport;

/// Persists the validated dataset and its rejections.
#[async_trait]
pub trait RecordOutputPort: Send + Sync {
    async fn write_clean_records(&self, records: &[CanonicalRecord]) -> anyhow::Result<()>;
    async fn write_rejected_records(&self, rejected: &[RejectedRecord]) -> anyhow::Result<()>;
}

/// Reads back a previously validated dataset.
#[async_trait]
pub trait RecordSourcePort: Send + Sync {
    async fn read_clean_records(&self) -> anyhow::Result<Vec<CanonicalRecord>>;
}

#[async_trait]
pub trait IndicatorOutputPort: Send + Sync {
    async fn write_indicators(&self, records: &[IndicatorRecord]) -> anyhow::Result<()>;
    async fn write_tables(&self, tables: &BTreeMap<IndicatorType, Vec<IndicatorRow>>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait IndicatorSourcePort: Send + Sync {
    async fn read_indicators(&self) -> anyhow::Result<Vec<IndicatorRecord>>;
}

/// JSON run artifacts: quality report, summaries and the metrics rendering.
#[async_trait]
pub trait ReportOutputPort: Send + Sync {
    async fn write_quality_report(&self, report: &QualityReport) -> anyhow::Result<()>;
    /// `None` when no previous run left a report behind
    async fn read_quality_report(&self) -> anyhow::Result<Option<QualityReport>>;
    async fn write_summary(&self, summary: &RunSummary) -> anyhow::Result<()>;
    async fn write_decompositions(&self, decompositions: &[DecompositionSummary]) -> anyhow::Result<()>;
    async fn write_growth_summaries(&self, summaries: &[GrowthSummary]) -> anyhow::Result<()>;
    async fn write_metrics(&self, rendered: &str) -> anyhow::Result<()>;
}
