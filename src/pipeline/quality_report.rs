//! Run quality report: one entry per source file plus run-level validation and
//! indicator diagnostics. Serialized to `quality_report.json`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalRecord, SourceType};
use crate::error::EcomapError;
use crate::pipeline::ingestion::delimiter::display_delimiter;
use crate::pipeline::ingestion::{LoadedSource, SourceFile};
use crate::pipeline::processing::indicators::{ConflictResolution, GrowthGap, IndicatorDiagnostics, SkippedGroup};
use crate::pipeline::processing::quality_gate::{CoverageFlag, ValidationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Failed,
}

/// Quality details for a single source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: String,
    pub path: String,
    pub source_type: SourceType,
    pub status: SourceStatus,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub encoding: Option<String>,
    pub encoding_detection: Option<String>,
    pub delimiter: Option<String>,
    pub locale: String,
    pub sha256: Option<String>,
    pub size_bytes: u64,
    pub rows_read: usize,
    pub records_emitted: usize,
    pub dropped_rows: usize,
    pub drop_reasons: BTreeMap<String, usize>,
    pub malformed_values: usize,
    pub empty_values: usize,
    /// Share of rows read that produced a record with a usable value
    pub completeness: f64,
    /// Canonical field -> source header
    pub column_mapping: BTreeMap<String, String>,
    pub notes: Vec<String>,
}

impl SourceReport {
    pub fn new(file: &SourceFile) -> Self {
        Self {
            source_id: file.source_id.clone(),
            path: file.path.display().to_string(),
            source_type: file.source_type,
            status: SourceStatus::Ok,
            error_kind: None,
            error: None,
            encoding: None,
            encoding_detection: None,
            delimiter: None,
            locale: file.locale.as_str().to_string(),
            sha256: None,
            size_bytes: 0,
            rows_read: 0,
            records_emitted: 0,
            dropped_rows: 0,
            drop_reasons: BTreeMap::new(),
            malformed_values: 0,
            empty_values: 0,
            completeness: 0.0,
            column_mapping: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn record_load(&mut self, loaded: &LoadedSource) {
        self.encoding = Some(loaded.encoding.to_string());
        self.encoding_detection = Some(loaded.encoding_detection.to_string());
        self.delimiter = Some(display_delimiter(loaded.delimiter).to_string());
        self.sha256 = Some(loaded.sha256.clone());
        self.size_bytes = loaded.size_bytes;
    }

    pub fn note(&mut self, note: String) {
        self.notes.push(note);
    }

    pub fn drop_row(&mut self, reason: &str) {
        self.dropped_rows += 1;
        *self.drop_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn finish(&mut self, records: &[CanonicalRecord]) {
        self.records_emitted = records.len();
        let with_value = records.iter().filter(|r| r.value.is_some()).count();
        self.completeness = if self.rows_read == 0 {
            0.0
        } else {
            with_value as f64 / self.rows_read as f64
        };
    }

    pub fn fail(&mut self, error: &EcomapError) {
        self.status = SourceStatus::Failed;
        self.error_kind = Some(error.kind().to_string());
        self.error = Some(error.to_string());
        self.records_emitted = 0;
        self.completeness = 0.0;
    }

    pub fn is_ok(&self) -> bool {
        self.status == SourceStatus::Ok
    }
}

/// Headline counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_harmonized: usize,
    pub records_clean: usize,
    pub records_rejected: usize,
    pub indicator_records: usize,
    /// Mean completeness of successful files weighted by the clean ratio, in [0, 1]
    pub quality_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub totals: RunTotals,
    pub sources: Vec<SourceReport>,
    pub rejections_by_reason: BTreeMap<String, usize>,
    pub coverage_flags: Vec<CoverageFlag>,
    pub conflicts_resolved: usize,
    pub conflicts: Vec<ConflictResolution>,
    pub skipped_groups: Vec<SkippedGroup>,
    pub growth_gaps: Vec<GrowthGap>,
}

impl QualityReport {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            totals: RunTotals::default(),
            sources: Vec::new(),
            rejections_by_reason: BTreeMap::new(),
            coverage_flags: Vec::new(),
            conflicts_resolved: 0,
            conflicts: Vec::new(),
            skipped_groups: Vec::new(),
            growth_gaps: Vec::new(),
        }
    }

    /// Add per-file entries in file order.
    pub fn add_sources(&mut self, sources: Vec<SourceReport>) {
        self.totals.files_processed += sources.len();
        self.totals.files_failed += sources.iter().filter(|s| !s.is_ok()).count();
        self.totals.records_harmonized += sources.iter().map(|s| s.records_emitted).sum::<usize>();
        self.sources.extend(sources);
        self.recompute_score();
    }

    pub fn add_validation(&mut self, outcome: &ValidationOutcome) {
        self.totals.records_clean = outcome.clean.len();
        self.totals.records_rejected = outcome.rejected.len();
        self.rejections_by_reason = outcome.rejection_counts();
        self.coverage_flags = outcome.coverage_flags.clone();
        self.recompute_score();
    }

    pub fn add_indicator_diagnostics(&mut self, diagnostics: &IndicatorDiagnostics, indicator_records: usize) {
        self.totals.indicator_records = indicator_records;
        self.conflicts_resolved = diagnostics.conflicts.len();
        self.conflicts = diagnostics.conflicts.clone();
        self.skipped_groups = diagnostics.skipped.clone();
        self.growth_gaps = diagnostics.gaps.clone();
        self.generated_at = Utc::now();
    }

    fn recompute_score(&mut self) {
        let ok: Vec<&SourceReport> = self.sources.iter().filter(|s| s.is_ok()).collect();
        if ok.is_empty() {
            self.totals.quality_score = 0.0;
            return;
        }
        let completeness = ok.iter().map(|s| s.completeness).sum::<f64>() / ok.len() as f64;
        let validated = self.totals.records_clean + self.totals.records_rejected;
        let clean_ratio = if validated == 0 {
            1.0
        } else {
            self.totals.records_clean as f64 / validated as f64
        };
        self.totals.quality_score = completeness * clean_ratio;
    }
}
