//! Location quotient and revealed comparative advantage.
//!
//! Both are the same ratio of shares, `(E_sr / E_r) / (E_sN / E_N)`: LQ over
//! employment by sector, RCA over export value by product.

use std::collections::BTreeMap;

use super::bands::BandThresholds;
use super::reconcile::Observation;
use crate::domain::{IndicatorRecord, IndicatorType, Metric, Period};

/// Which quotient to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quotient {
    Location,
    ComparativeAdvantage,
}

impl Quotient {
    pub fn metric(&self) -> Metric {
        match self {
            Quotient::Location => Metric::Employment,
            Quotient::ComparativeAdvantage => Metric::Exports,
        }
    }

    pub fn indicator_type(&self) -> IndicatorType {
        match self {
            Quotient::Location => IndicatorType::LocationQuotient,
            Quotient::ComparativeAdvantage => IndicatorType::RevealedComparativeAdvantage,
        }
    }

    fn band(&self, thresholds: &BandThresholds, value: f64) -> &'static str {
        match self {
            Quotient::Location => thresholds.location_quotient(value),
            Quotient::ComparativeAdvantage => thresholds.comparative_advantage(value),
        }
    }
}

/// Region totals and per-activity values for one period.
#[derive(Default)]
struct PeriodTable<'a> {
    regions: BTreeMap<&'a str, BTreeMap<&'a str, f64>>,
}

impl<'a> PeriodTable<'a> {
    fn region_total(values: &BTreeMap<&'a str, f64>) -> f64 {
        values.values().sum()
    }
}

/// Compute a quotient for every observed (region, activity, period) of the metric.
///
/// National figures come from the national reference region when it reports in the
/// period, otherwise from the sum over all regions. The reference region itself gets
/// no quotient. Aggregate rows are ignored. A zero region total, national activity
/// total or national total yields a null value.
pub fn compute(
    quotient: Quotient,
    observations: &[&Observation],
    national_reference: Option<&str>,
    thresholds: &BandThresholds,
) -> Vec<IndicatorRecord> {
    let metric = quotient.metric();
    let mut periods: BTreeMap<Period, PeriodTable> = BTreeMap::new();

    for obs in observations
        .iter()
        .filter(|o| o.metric == metric && !o.activity.is_aggregate())
    {
        *periods
            .entry(obs.period)
            .or_default()
            .regions
            .entry(obs.region_code.as_str())
            .or_default()
            .entry(obs.activity.code())
            .or_insert(0.0) += obs.value;
    }

    let mut records = Vec::new();
    for (period, table) in &periods {
        let reference = national_reference.and_then(|name| table.regions.get(name));

        let (national_by_activity, national_total) = match reference {
            Some(values) => (values.clone(), PeriodTable::region_total(values)),
            None => {
                let mut by_activity: BTreeMap<&str, f64> = BTreeMap::new();
                for values in table.regions.values() {
                    for (code, value) in values {
                        *by_activity.entry(*code).or_insert(0.0) += value;
                    }
                }
                let total: f64 = by_activity.values().sum();
                (by_activity, total)
            }
        };

        for (region, values) in &table.regions {
            if Some(*region) == national_reference {
                continue;
            }
            let region_total = PeriodTable::region_total(values);

            for (code, value) in values {
                let national_activity = national_by_activity.get(code).copied().unwrap_or(0.0);
                let lq = if region_total == 0.0 || national_activity == 0.0 || national_total == 0.0 {
                    None
                } else {
                    Some((value / region_total) / (national_activity / national_total))
                };

                records.push(IndicatorRecord {
                    indicator_type: quotient.indicator_type(),
                    metric,
                    region_code: region.to_string(),
                    sector_or_product_code: Some(code.to_string()),
                    period: *period,
                    value: lq,
                    classification_band: lq.map(|v| quotient.band(thresholds, v).to_string()),
                });
            }
        }
    }

    records
}
