//! Indicator engine: LQ, RCA, HHI, growth and seasonal decomposition over clean records.

pub mod bands;
pub mod concentration;
pub mod growth;
pub mod reconcile;
pub mod seasonal;
pub mod specialization;

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::config::PipelineConfig;
use crate::domain::{CanonicalRecord, IndicatorRecord, IndicatorType, Metric, Period};
use crate::observability::metrics;

pub use growth::{GrowthGap, GrowthSummary};
pub use reconcile::{ConflictResolution, Observation};
pub use seasonal::{DecompositionSummary, SeasonalModel};

use specialization::Quotient;

/// Identity of one time series: a metric in a region, for one activity code or,
/// when `code` is `None`, for the region total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    pub metric: Metric,
    pub region_code: String,
    pub code: Option<String>,
}

/// A group for which an indicator was not computed, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub indicator_type: IndicatorType,
    pub metric: Metric,
    pub region_code: Option<String>,
    pub sector_or_product_code: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorDiagnostics {
    pub conflicts: Vec<ConflictResolution>,
    pub skipped: Vec<SkippedGroup>,
    pub gaps: Vec<GrowthGap>,
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorOutput {
    pub records: Vec<IndicatorRecord>,
    pub decompositions: Vec<DecompositionSummary>,
    pub growth_summaries: Vec<GrowthSummary>,
    pub diagnostics: IndicatorDiagnostics,
}

impl IndicatorOutput {
    pub fn count_of(&self, indicator_type: IndicatorType) -> usize {
        self.records.iter().filter(|r| r.indicator_type == indicator_type).count()
    }
}

/// Compute every indicator family from validated records.
pub fn compute_indicators(records: &[CanonicalRecord], config: &PipelineConfig) -> IndicatorOutput {
    let _span = info_span!("indicators", records = records.len()).entered();
    let started = Instant::now();
    let thresholds = &config.thresholds;
    let national = config.geography.national_reference.as_deref();

    let (observations, conflicts) = reconcile::reconcile(records, &config.indicators);
    let obs_refs: Vec<&Observation> = observations.iter().collect();
    let mut out = IndicatorOutput::default();
    out.diagnostics.conflicts = conflicts;

    for quotient in [Quotient::Location, Quotient::ComparativeAdvantage] {
        let metric = quotient.metric();
        if !observations.iter().any(|o| o.metric == metric) {
            debug!(indicator = quotient.indicator_type().as_str(), "No observations for metric");
            out.diagnostics.skipped.push(SkippedGroup {
                indicator_type: quotient.indicator_type(),
                metric,
                region_code: None,
                sector_or_product_code: None,
                reason: format!("no {} observations", metric.as_str()),
            });
            continue;
        }
        out.records
            .extend(specialization::compute(quotient, &obs_refs, national, thresholds));
    }

    out.records
        .extend(concentration::herfindahl_hirschman(&obs_refs, thresholds));

    for (key, series) in build_series(&observations) {
        let growth = growth::series_growth(&key, &series, thresholds);
        out.records.extend(growth.records);
        out.diagnostics.gaps.extend(growth.gaps);
        out.growth_summaries.extend(growth.summary);

        let monthly = series.keys().next().map_or(false, Period::is_monthly);
        if !monthly {
            continue;
        }
        match seasonal::decompose(
            &key,
            &series,
            config.indicators.seasonal_model,
            config.indicators.min_seasonal_periods,
        ) {
            Ok(summary) => {
                out.records
                    .extend(seasonal::seasonality_records(&summary, thresholds));
                out.decompositions.push(summary);
            }
            Err(skip) => {
                debug!(
                    metric = key.metric.as_str(),
                    region = %key.region_code,
                    code = key.code.as_deref().unwrap_or("-"),
                    reason = %skip,
                    "Seasonal decomposition skipped"
                );
                out.diagnostics.skipped.push(SkippedGroup {
                    indicator_type: IndicatorType::Seasonality,
                    metric: key.metric,
                    region_code: Some(key.region_code.clone()),
                    sector_or_product_code: key.code.clone(),
                    reason: skip.to_string(),
                });
            }
        }
    }

    for indicator_type in IndicatorType::ALL {
        metrics::indicators::records_computed(indicator_type.as_str(), out.count_of(indicator_type));
    }
    metrics::indicators::null_values(out.records.iter().filter(|r| !r.is_computed()).count());
    metrics::indicators::conflicts_resolved(out.diagnostics.conflicts.len());
    metrics::indicators::groups_skipped(out.diagnostics.skipped.len());
    metrics::indicators::duration(started.elapsed().as_secs_f64());

    info!(
        records = out.records.len(),
        conflicts = out.diagnostics.conflicts.len(),
        skipped = out.diagnostics.skipped.len(),
        decompositions = out.decompositions.len(),
        "Indicator computation complete"
    );
    out
}

/// Per-activity series plus a synthesized region-total series per (metric, region),
/// each split by granularity so yearly and monthly points never mix.
///
/// The region total sums the non-aggregate codes of each period. A region that only
/// reports the aggregate row already has its total as the `TOTAL` series.
fn build_series(observations: &[Observation]) -> Vec<(SeriesKey, BTreeMap<Period, f64>)> {
    let mut series: BTreeMap<(SeriesKey, bool), BTreeMap<Period, f64>> = BTreeMap::new();
    let mut totals: BTreeMap<(SeriesKey, bool), BTreeMap<Period, f64>> = BTreeMap::new();

    for obs in observations {
        let monthly = obs.period.is_monthly();
        let key = SeriesKey {
            metric: obs.metric,
            region_code: obs.region_code.clone(),
            code: Some(obs.activity.code().to_string()),
        };
        series.entry((key, monthly)).or_default().insert(obs.period, obs.value);

        if !obs.activity.is_aggregate() {
            let total_key = SeriesKey {
                metric: obs.metric,
                region_code: obs.region_code.clone(),
                code: None,
            };
            *totals
                .entry((total_key, monthly))
                .or_default()
                .entry(obs.period)
                .or_insert(0.0) += obs.value;
        }
    }

    series.extend(totals);
    series
        .into_iter()
        .map(|((key, _monthly), points)| (key, points))
        .collect()
}
