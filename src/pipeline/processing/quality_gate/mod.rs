use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::domain::{ActivityCode, CanonicalRecord, Dimension, Period};
use crate::observability::metrics;

/// Why a harmonized record was kept out of the clean dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    OutOfScopeRegion,
    OutsideTemporalWindow,
    NegativeValue,
    DuplicateKey,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::OutOfScopeRegion => "out_of_scope_region",
            RejectionReason::OutsideTemporalWindow => "outside_temporal_window",
            RejectionReason::NegativeValue => "negative_value",
            RejectionReason::DuplicateKey => "duplicate_key",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record: CanonicalRecord,
    pub reason: RejectionReason,
}

/// A (region, period, dimension) cell whose category coverage is below the minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageFlag {
    pub region_code: String,
    pub period: Period,
    pub dimension: Dimension,
    pub present: usize,
    pub expected: usize,
    pub coverage: f64,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub clean: Vec<CanonicalRecord>,
    pub rejected: Vec<RejectedRecord>,
    pub coverage_flags: Vec<CoverageFlag>,
}

impl ValidationOutcome {
    pub fn rejection_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for rejected in &self.rejected {
            *counts.entry(rejected.reason.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Trait for implementing record validation logic
pub trait QualityGate {
    /// Split records into clean and rejected, and flag low category coverage
    fn validate(&self, records: Vec<CanonicalRecord>) -> ValidationOutcome;
}

/// Configuration for the default quality gate rules
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Regions in scope, including the national reference
    pub allowed_regions: BTreeSet<String>,
    pub window_start: Period,
    pub window_end: Period,
    pub min_coverage: f64,
    pub expected_sectors: Option<BTreeSet<String>>,
    pub expected_products: Option<BTreeSet<String>>,
}

impl QualityGateConfig {
    pub fn from_pipeline_config(config: &PipelineConfig) -> Self {
        Self {
            allowed_regions: config.geography.allowed_regions(),
            window_start: config.temporal.start,
            window_end: config.temporal.end,
            min_coverage: config.quality.min_coverage,
            expected_sectors: config.quality.expected_sectors.clone(),
            expected_products: config.quality.expected_products.clone(),
        }
    }
}

/// Default quality gate: scope, window, sign and duplicate rules, then coverage.
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

impl DefaultQualityGate {
    pub fn new(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// First failing rule among scope, window and sign.
    fn check(&self, record: &CanonicalRecord) -> Option<RejectionReason> {
        if !self.config.allowed_regions.contains(&record.region_code) {
            return Some(RejectionReason::OutOfScopeRegion);
        }
        if !record.period.within(&self.config.window_start, &self.config.window_end) {
            return Some(RejectionReason::OutsideTemporalWindow);
        }
        if record.unit.is_non_negative() && record.value.map_or(false, |v| v < 0.0) {
            return Some(RejectionReason::NegativeValue);
        }
        None
    }

    fn coverage_flags(&self, clean: &[CanonicalRecord]) -> Vec<CoverageFlag> {
        let mut present: BTreeMap<(String, Period, Dimension), BTreeSet<String>> = BTreeMap::new();
        let mut observed: BTreeMap<Dimension, BTreeSet<String>> = BTreeMap::new();

        for record in clean.iter().filter(|r| !r.activity.is_aggregate()) {
            let dimension = record.activity.dimension();
            let code = record.activity.code().to_string();
            present
                .entry((record.region_code.clone(), record.period, dimension))
                .or_default()
                .insert(code.clone());
            observed.entry(dimension).or_default().insert(code);
        }

        let mut flags = Vec::new();
        for ((region_code, period, dimension), codes) in present {
            let configured = match dimension {
                Dimension::Sector => self.config.expected_sectors.as_ref(),
                Dimension::Product => self.config.expected_products.as_ref(),
            };
            let expected = match configured.or_else(|| observed.get(&dimension)) {
                Some(expected) if !expected.is_empty() => expected,
                _ => continue,
            };

            let missing: Vec<String> = expected.difference(&codes).cloned().collect();
            let covered = expected.len() - missing.len();
            let coverage = covered as f64 / expected.len() as f64;
            if coverage < self.config.min_coverage {
                debug!(region = %region_code, period = %period, %dimension, coverage, "Low category coverage");
                flags.push(CoverageFlag {
                    region_code,
                    period,
                    dimension,
                    present: covered,
                    expected: expected.len(),
                    coverage,
                    missing,
                });
            }
        }
        flags
    }
}

impl QualityGate for DefaultQualityGate {
    fn validate(&self, records: Vec<CanonicalRecord>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        let mut seen: HashSet<(String, ActivityCode, Period, String)> = HashSet::new();

        for record in records {
            let reason = self.check(&record).or_else(|| {
                let key = (
                    record.region_code.clone(),
                    record.activity.clone(),
                    record.period,
                    record.source_id.clone(),
                );
                (!seen.insert(key)).then_some(RejectionReason::DuplicateKey)
            });

            match reason {
                Some(reason) => {
                    metrics::quality_gate::record_rejected(reason.as_str());
                    outcome.rejected.push(RejectedRecord { record, reason });
                }
                None => outcome.clean.push(record),
            }
        }

        outcome.coverage_flags = self.coverage_flags(&outcome.clean);
        metrics::quality_gate::records_accepted(outcome.clean.len());
        metrics::quality_gate::coverage_flags(outcome.coverage_flags.len());

        info!(
            clean = outcome.clean.len(),
            rejected = outcome.rejected.len(),
            coverage_flags = outcome.coverage_flags.len(),
            "Validation complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SourceType, Unit};

    fn gate() -> DefaultQualityGate {
        DefaultQualityGate::new(QualityGateConfig {
            allowed_regions: ["Joinville", "Blumenau", "Santa Catarina"].iter().map(|s| s.to_string()).collect(),
            window_start: Period::year(2020),
            window_end: Period::year(2022),
            min_coverage: 0.8,
            expected_sectors: None,
            expected_products: None,
        })
    }

    fn record(region: &str, sector: &str, year: i32, value: Option<f64>, source: &str) -> CanonicalRecord {
        CanonicalRecord {
            region_code: region.into(),
            period: Period::year(year),
            activity: ActivityCode::Sector(sector.into()),
            value,
            unit: Unit::EmploymentCount,
            source_id: source.into(),
            source_type: SourceType::EmploymentStock,
        }
    }

    #[test]
    fn rules_apply_in_order() {
        let outcome = gate().validate(vec![
            record("Lages", "C", 2019, Some(-1.0), "a"),
            record("Joinville", "C", 2019, Some(-1.0), "a"),
            record("Joinville", "C", 2021, Some(-1.0), "a"),
            record("Joinville", "C", 2021, Some(5.0), "a"),
            record("Santa Catarina", "C", 2021, None, "a"),
        ]);
        let reasons: Vec<_> = outcome.rejected.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectionReason::OutOfScopeRegion,
                RejectionReason::OutsideTemporalWindow,
                RejectionReason::NegativeValue,
            ]
        );
        assert_eq!(outcome.clean.len(), 2);
    }

    #[test]
    fn duplicate_keys_keep_the_first_record() {
        let outcome = gate().validate(vec![
            record("Joinville", "C", 2021, Some(10.0), "a"),
            record("Joinville", "C", 2021, Some(20.0), "a"),
            record("Joinville", "C", 2021, Some(30.0), "b"),
        ]);
        assert_eq!(outcome.clean.len(), 2);
        assert_eq!(outcome.clean[0].value, Some(10.0));
        assert_eq!(outcome.rejected[0].reason, RejectionReason::DuplicateKey);
        assert_eq!(outcome.rejected[0].record.value, Some(20.0));
        assert_eq!(outcome.rejection_counts()["duplicate_key"], 1);
    }

    #[test]
    fn negative_flows_are_allowed() {
        let mut flow = record("Joinville", "C", 2021, Some(-30.0), "caged");
        flow.unit = Unit::EmploymentChange;
        flow.source_type = SourceType::EmploymentFlow;
        let outcome = gate().validate(vec![flow]);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn coverage_is_measured_against_observed_categories() {
        let outcome = gate().validate(vec![
            record("Joinville", "A", 2021, Some(1.0), "a"),
            record("Joinville", "B", 2021, Some(1.0), "a"),
            record("Joinville", "C", 2021, Some(1.0), "a"),
            record("Joinville", "D", 2021, Some(1.0), "a"),
            record("Blumenau", "A", 2021, Some(1.0), "a"),
            record("Blumenau", "TOTAL", 2021, Some(9.0), "a"),
        ]);
        assert_eq!(outcome.coverage_flags.len(), 1);
        let flag = &outcome.coverage_flags[0];
        assert_eq!(flag.region_code, "Blumenau");
        assert_eq!(flag.expected, 4);
        assert_eq!(flag.present, 1);
        assert_eq!(flag.missing, vec!["B", "C", "D"]);
    }
}
