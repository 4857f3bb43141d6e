use std::collections::BTreeMap;

use super::bands::BandThresholds;
use super::reconcile::Observation;
use crate::domain::{IndicatorRecord, IndicatorType, Metric, Period};

/// Herfindahl-Hirschman index of employment across sectors, per (region, period).
///
/// `HHI = Σ (E_sr / E_r)²`, in `(0, 1]`. Null when the region total is zero.
pub fn herfindahl_hirschman(observations: &[&Observation], thresholds: &BandThresholds) -> Vec<IndicatorRecord> {
    let mut groups: BTreeMap<(&str, Period), Vec<f64>> = BTreeMap::new();
    for obs in observations
        .iter()
        .filter(|o| o.metric == Metric::Employment && !o.activity.is_aggregate())
    {
        groups
            .entry((obs.region_code.as_str(), obs.period))
            .or_default()
            .push(obs.value);
    }

    groups
        .into_iter()
        .map(|((region, period), values)| {
            let value = hhi(&values);
            IndicatorRecord {
                indicator_type: IndicatorType::HerfindahlHirschman,
                metric: Metric::Employment,
                region_code: region.to_string(),
                sector_or_product_code: None,
                period,
                value,
                classification_band: value.map(|v| thresholds.concentration(v).to_string()),
            }
        })
        .collect()
}

/// Sum of squared shares; `None` when the values sum to zero.
pub fn hhi(values: &[f64]) -> Option<f64> {
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v / total).powi(2)).sum())
}
