//! Run metrics for the ecomap pipeline
//!
//! Counters and histograms are recorded through the `metrics` facade under the
//! names of [`MetricName`]. A Prometheus recorder is installed by [`init`] and
//! its text rendering is written next to the other run artifacts.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Harmonize metrics
    HarmonizeFilesProcessed,
    HarmonizeFilesFailed,
    HarmonizeRecordsEmitted,
    HarmonizeRowsDropped,
    HarmonizeMalformedValues,
    HarmonizeDuration,

    // Quality Gate metrics
    QualityGateRecordsAccepted,
    QualityGateRecordsRejected,
    QualityGateCoverageFlags,

    // Indicator metrics
    IndicatorsRecordsComputed,
    IndicatorsNullValues,
    IndicatorsConflictsResolved,
    IndicatorsGroupsSkipped,
    IndicatorsDuration,

    // Output metrics
    OutputFilesWritten,
    OutputRowsWritten,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HarmonizeFilesProcessed => "ecomap_harmonize_files_processed_total",
            MetricName::HarmonizeFilesFailed => "ecomap_harmonize_files_failed_total",
            MetricName::HarmonizeRecordsEmitted => "ecomap_harmonize_records_emitted_total",
            MetricName::HarmonizeRowsDropped => "ecomap_harmonize_rows_dropped_total",
            MetricName::HarmonizeMalformedValues => "ecomap_harmonize_malformed_values_total",
            MetricName::HarmonizeDuration => "ecomap_harmonize_duration_seconds",

            MetricName::QualityGateRecordsAccepted => "ecomap_quality_gate_records_accepted_total",
            MetricName::QualityGateRecordsRejected => "ecomap_quality_gate_records_rejected_total",
            MetricName::QualityGateCoverageFlags => "ecomap_quality_gate_coverage_flags_total",

            MetricName::IndicatorsRecordsComputed => "ecomap_indicators_records_total",
            MetricName::IndicatorsNullValues => "ecomap_indicators_null_values_total",
            MetricName::IndicatorsConflictsResolved => "ecomap_indicators_conflicts_resolved_total",
            MetricName::IndicatorsGroupsSkipped => "ecomap_indicators_groups_skipped_total",
            MetricName::IndicatorsDuration => "ecomap_indicators_duration_seconds",

            MetricName::OutputFilesWritten => "ecomap_output_files_written_total",
            MetricName::OutputRowsWritten => "ecomap_output_rows_written_total",
        }
    }

    /// All metric names, in phase order
    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            HarmonizeFilesProcessed,
            HarmonizeFilesFailed,
            HarmonizeRecordsEmitted,
            HarmonizeRowsDropped,
            HarmonizeMalformedValues,
            HarmonizeDuration,
            QualityGateRecordsAccepted,
            QualityGateRecordsRejected,
            QualityGateCoverageFlags,
            IndicatorsRecordsComputed,
            IndicatorsNullValues,
            IndicatorsConflictsResolved,
            IndicatorsGroupsSkipped,
            IndicatorsDuration,
            OutputFilesWritten,
            OutputRowsWritten,
        ]
        .into_iter()
    }

    /// (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::HarmonizeFilesProcessed => ("harmonize", "Source files harmonized", None),
            MetricName::HarmonizeFilesFailed => ("harmonize", "Source files that failed to harmonize", None),
            MetricName::HarmonizeRecordsEmitted => ("harmonize", "Canonical records emitted", None),
            MetricName::HarmonizeRowsDropped => ("harmonize", "Raw rows dropped by reason", None),
            MetricName::HarmonizeMalformedValues => ("harmonize", "Values coerced to null", None),
            MetricName::HarmonizeDuration => ("harmonize", "Per-file harmonization duration", Some("s")),

            MetricName::QualityGateRecordsAccepted => ("quality_gate", "Records passing validation", None),
            MetricName::QualityGateRecordsRejected => ("quality_gate", "Records rejected by reason", None),
            MetricName::QualityGateCoverageFlags => ("quality_gate", "Low-coverage flags raised", None),

            MetricName::IndicatorsRecordsComputed => ("indicators", "Indicator records by type", None),
            MetricName::IndicatorsNullValues => ("indicators", "Indicator records with null value", None),
            MetricName::IndicatorsConflictsResolved => ("indicators", "Cross-source conflicts resolved", None),
            MetricName::IndicatorsGroupsSkipped => ("indicators", "Indicator groups skipped", None),
            MetricName::IndicatorsDuration => ("indicators", "Indicator computation duration", Some("s")),

            MetricName::OutputFilesWritten => ("output", "Artifact files written", None),
            MetricName::OutputRowsWritten => ("output", "Rows written to CSV artifacts", None),
        }
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();

    for name in MetricName::all_metrics() {
        let (phase, description, unit) = name.metadata();
        let text = format!("[{}] {}", phase, description);
        match unit {
            Some(_) => ::metrics::describe_histogram!(name.as_str(), ::metrics::Unit::Seconds, text),
            None => ::metrics::describe_counter!(name.as_str(), text),
        }
    }
    info!("Metrics recorder installed");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Harmonize Metrics
// ============================================================================

pub mod harmonize {
    use super::MetricName;

    pub fn file_processed(source_type: &str) {
        ::metrics::counter!(MetricName::HarmonizeFilesProcessed.as_str(), "source_type" => source_type.to_string())
            .increment(1);
    }

    pub fn file_failed(error_kind: &str) {
        ::metrics::counter!(MetricName::HarmonizeFilesFailed.as_str(), "error_kind" => error_kind.to_string())
            .increment(1);
    }

    pub fn records_emitted(count: usize) {
        ::metrics::counter!(MetricName::HarmonizeRecordsEmitted.as_str()).increment(count as u64);
    }

    pub fn rows_dropped(reason: &str, count: usize) {
        ::metrics::counter!(MetricName::HarmonizeRowsDropped.as_str(), "reason" => reason.to_string())
            .increment(count as u64);
    }

    pub fn malformed_values(count: usize) {
        ::metrics::counter!(MetricName::HarmonizeMalformedValues.as_str()).increment(count as u64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::HarmonizeDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Quality Gate Metrics
// ============================================================================

pub mod quality_gate {
    use super::MetricName;

    /// Record that a record was rejected, labelled by the failing rule
    pub fn record_rejected(reason: &str) {
        ::metrics::counter!(MetricName::QualityGateRecordsRejected.as_str(), "reason" => reason.to_string())
            .increment(1);
    }

    pub fn records_accepted(count: usize) {
        ::metrics::counter!(MetricName::QualityGateRecordsAccepted.as_str()).increment(count as u64);
    }

    pub fn coverage_flags(count: usize) {
        ::metrics::counter!(MetricName::QualityGateCoverageFlags.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Indicator Metrics
// ============================================================================

pub mod indicators {
    use super::MetricName;

    pub fn records_computed(indicator_type: &str, count: usize) {
        ::metrics::counter!(
            MetricName::IndicatorsRecordsComputed.as_str(),
            "indicator_type" => indicator_type.to_string()
        )
        .increment(count as u64);
    }

    pub fn null_values(count: usize) {
        ::metrics::counter!(MetricName::IndicatorsNullValues.as_str()).increment(count as u64);
    }

    pub fn conflicts_resolved(count: usize) {
        ::metrics::counter!(MetricName::IndicatorsConflictsResolved.as_str()).increment(count as u64);
    }

    pub fn groups_skipped(count: usize) {
        ::metrics::counter!(MetricName::IndicatorsGroupsSkipped.as_str()).increment(count as u64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::IndicatorsDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Output Metrics
// ============================================================================

pub mod output {
    use super::MetricName;
    use tracing::debug;

    pub fn file_written(artifact: &str) {
        ::metrics::counter!(MetricName::OutputFilesWritten.as_str(), "artifact" => artifact.to_string())
            .increment(1);
        debug!(artifact, "Artifact written");
    }

    pub fn rows_written(artifact: &str, rows: usize) {
        ::metrics::counter!(MetricName::OutputRowsWritten.as_str(), "artifact" => artifact.to_string())
            .increment(rows as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("ecomap_")));
    }

    #[test]
    fn durations_carry_a_unit() {
        for name in MetricName::all_metrics() {
            let (_, _, unit) = name.metadata();
            assert_eq!(name.as_str().ends_with("_seconds"), unit == Some("s"));
        }
    }
}
