use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::app::ports::ReportOutputPort;
use crate::constants::{DECOMPOSITIONS_FILE, GROWTH_SUMMARY_FILE, METRICS_FILE, QUALITY_REPORT_FILE, SUMMARY_FILE};
use crate::observability::metrics;
use crate::pipeline::processing::aggregate::RunSummary;
use crate::pipeline::processing::indicators::{DecompositionSummary, GrowthSummary};
use crate::pipeline::quality_report::QualityReport;

/// File-based implementation of ReportOutputPort
/// Writes pretty-printed JSON reports and the Prometheus text rendering
pub struct FileReportOutputAdapter {
    directory: PathBuf,
}

impl FileReportOutputAdapter {
    pub fn new(directory: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create output directory {}", directory.display()))?;
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> anyhow::Result<()> {
        let path = self.directory.join(file_name);
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writeln!(writer)?;
        writer.flush()?;

        info!(path = %path.display(), "Wrote {}", file_name);
        metrics::output::file_written(file_name);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportOutputPort for FileReportOutputAdapter {
    async fn write_quality_report(&self, report: &QualityReport) -> anyhow::Result<()> {
        self.write_json(QUALITY_REPORT_FILE, report)
    }

    async fn read_quality_report(&self) -> anyhow::Result<Option<QualityReport>> {
        let path = self.directory.join(QUALITY_REPORT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let report = serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(report))
    }

    async fn write_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        self.write_json(SUMMARY_FILE, summary)
    }

    async fn write_decompositions(&self, decompositions: &[DecompositionSummary]) -> anyhow::Result<()> {
        self.write_json(DECOMPOSITIONS_FILE, decompositions)
    }

    async fn write_growth_summaries(&self, summaries: &[GrowthSummary]) -> anyhow::Result<()> {
        self.write_json(GROWTH_SUMMARY_FILE, summaries)
    }

    async fn write_metrics(&self, rendered: &str) -> anyhow::Result<()> {
        let path = self.directory.join(METRICS_FILE);
        fs::write(&path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote metrics snapshot");
        Ok(())
    }
}
