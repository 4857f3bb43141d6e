//! Classical seasonal decomposition of monthly series.
//!
//! Trend is a 2x12 centered moving average; seasonal indices are the per-calendar-month
//! means of the detrended series, normalized to sum 0 (additive) or mean 1
//! (multiplicative); the residual is what remains.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::bands::BandThresholds;
use super::SeriesKey;
use crate::domain::{IndicatorRecord, IndicatorType, Metric, Period};

const SEASON: usize = 12;
const HALF_WINDOW: usize = SEASON / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalModel {
    #[default]
    Additive,
    Multiplicative,
}

impl SeasonalModel {
    /// Value of a seasonal component that means "no seasonal effect".
    pub fn neutral_point(&self) -> f64 {
        match self {
            SeasonalModel::Additive => 0.0,
            SeasonalModel::Multiplicative => 1.0,
        }
    }

    fn detrend(&self, value: f64, trend: f64) -> f64 {
        match self {
            SeasonalModel::Additive => value - trend,
            SeasonalModel::Multiplicative => value / trend,
        }
    }

    fn residual(&self, value: f64, trend: f64, seasonal: f64) -> f64 {
        match self {
            SeasonalModel::Additive => value - trend - seasonal,
            SeasonalModel::Multiplicative => value / (trend * seasonal),
        }
    }

    /// Seasonal and residual combined back into the detrended scale.
    fn combine(&self, seasonal: f64, residual: f64) -> f64 {
        match self {
            SeasonalModel::Additive => seasonal + residual,
            SeasonalModel::Multiplicative => seasonal * residual,
        }
    }
}

/// Why a monthly series was not decomposed.
#[derive(Debug, Clone, PartialEq)]
pub enum SeasonalSkip {
    TooShort { periods: usize, required: usize },
    NotContiguous { missing: Period },
    NonPositive,
}

impl std::fmt::Display for SeasonalSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeasonalSkip::TooShort { periods, required } => {
                write!(f, "insufficient history: {} monthly periods, {} required", periods, required)
            }
            SeasonalSkip::NotContiguous { missing } => write!(f, "series has a gap at {}", missing),
            SeasonalSkip::NonPositive => f.write_str("multiplicative model requires strictly positive values"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionSummary {
    pub metric: Metric,
    pub region_code: String,
    pub sector_or_product_code: Option<String>,
    pub model: SeasonalModel,
    pub periods: Vec<Period>,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
    /// Index for January through December
    pub seasonal_indices: Vec<f64>,
    /// `max(0, 1 - Var(R) / Var(S + R))`
    pub seasonal_strength: f64,
    pub strength_class: String,
    pub peak_month: u32,
    pub trough_month: u32,
}

/// Decompose a contiguous monthly series.
pub fn decompose(
    key: &SeriesKey,
    series: &BTreeMap<Period, f64>,
    model: SeasonalModel,
    min_periods: usize,
) -> Result<DecompositionSummary, SeasonalSkip> {
    if series.len() < min_periods {
        return Err(SeasonalSkip::TooShort {
            periods: series.len(),
            required: min_periods,
        });
    }
    let periods: Vec<Period> = series.keys().copied().collect();
    if let Some(pair) = periods.windows(2).find(|pair| pair[0].next() != pair[1]) {
        return Err(SeasonalSkip::NotContiguous {
            missing: pair[0].next(),
        });
    }
    let observed: Vec<f64> = series.values().copied().collect();
    if model == SeasonalModel::Multiplicative && observed.iter().any(|v| *v <= 0.0) {
        return Err(SeasonalSkip::NonPositive);
    }

    let n = observed.len();
    let trend = centered_moving_average(&observed);
    let month_slot = |t: usize| periods[t].month.map(|m| m as usize - 1).unwrap_or(0);

    let mut sums = [0.0; SEASON];
    let mut counts = [0usize; SEASON];
    for t in 0..n {
        if let Some(tr) = trend[t] {
            sums[month_slot(t)] += model.detrend(observed[t], tr);
            counts[month_slot(t)] += 1;
        }
    }
    let raw_indices: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { model.neutral_point() })
        .collect();
    let mean_index = raw_indices.iter().sum::<f64>() / SEASON as f64;
    let seasonal_indices: Vec<f64> = raw_indices
        .iter()
        .map(|idx| match model {
            SeasonalModel::Additive => idx - mean_index,
            SeasonalModel::Multiplicative => idx / mean_index,
        })
        .collect();

    let seasonal: Vec<f64> = (0..n).map(|t| seasonal_indices[month_slot(t)]).collect();
    let residual: Vec<Option<f64>> = (0..n)
        .map(|t| trend[t].map(|tr| model.residual(observed[t], tr, seasonal[t])))
        .collect();

    let (r_values, sr_values): (Vec<f64>, Vec<f64>) = (0..n)
        .filter_map(|t| residual[t].map(|r| (r, model.combine(seasonal[t], r))))
        .unzip();
    let seasonal_strength = seasonal_strength(&r_values, &sr_values);

    let (peak_slot, trough_slot) = extremes(&seasonal_indices);

    Ok(DecompositionSummary {
        metric: key.metric,
        region_code: key.region_code.clone(),
        sector_or_product_code: key.code.clone(),
        model,
        periods,
        observed,
        trend,
        seasonal,
        residual,
        seasonal_indices,
        seasonal_strength,
        strength_class: strength_class(seasonal_strength).to_string(),
        peak_month: peak_slot as u32 + 1,
        trough_month: trough_slot as u32 + 1,
    })
}

/// One `seasonality` record per period of a decomposed series.
pub fn seasonality_records(summary: &DecompositionSummary, thresholds: &BandThresholds) -> Vec<IndicatorRecord> {
    let neutral = summary.model.neutral_point();
    summary
        .periods
        .iter()
        .zip(summary.seasonal.iter())
        .map(|(period, component)| IndicatorRecord {
            indicator_type: IndicatorType::Seasonality,
            metric: summary.metric,
            region_code: summary.region_code.clone(),
            sector_or_product_code: summary.sector_or_product_code.clone(),
            period: *period,
            value: Some(*component),
            classification_band: Some(thresholds.seasonal(*component, neutral).to_string()),
        })
        .collect()
}

/// 2x12 centered moving average; undefined for the first and last six points.
pub fn centered_moving_average(values: &[f64]) -> Vec<Option<f64>> {
    let n = values.len();
    (0..n)
        .map(|t| {
            if t < HALF_WINDOW || t + HALF_WINDOW >= n {
                return None;
            }
            let inner: f64 = values[t + 1 - HALF_WINDOW..t + HALF_WINDOW].iter().sum();
            let edges = 0.5 * (values[t - HALF_WINDOW] + values[t + HALF_WINDOW]);
            Some((inner + edges) / SEASON as f64)
        })
        .collect()
}

pub fn seasonal_strength(residual: &[f64], seasonal_plus_residual: &[f64]) -> f64 {
    let var_sr = variance(seasonal_plus_residual);
    if var_sr == 0.0 {
        return 0.0;
    }
    (1.0 - variance(residual) / var_sr).max(0.0)
}

pub fn strength_class(strength: f64) -> &'static str {
    if strength >= 0.6 {
        "strong"
    } else if strength >= 0.3 {
        "moderate"
    } else {
        "weak"
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn extremes(indices: &[f64]) -> (usize, usize) {
    let mut peak = 0;
    let mut trough = 0;
    for (slot, value) in indices.iter().enumerate() {
        if *value > indices[peak] {
            peak = slot;
        }
        if *value < indices[trough] {
            trough = slot;
        }
    }
    (peak, trough)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: [f64; 12] = [-5.0, -3.0, 0.0, 2.0, 4.0, 6.0, 4.0, 2.0, 0.0, -2.0, -4.0, -4.0];

    fn key() -> SeriesKey {
        SeriesKey {
            metric: Metric::Employment,
            region_code: "Joinville".into(),
            code: Some("C".into()),
        }
    }

    fn monthly(months: usize, value: impl Fn(usize) -> f64) -> BTreeMap<Period, f64> {
        (0..months)
            .map(|i| {
                let period = Period::month(2018 + (i / 12) as i32, (i % 12) as u32 + 1).unwrap();
                (period, value(i))
            })
            .collect()
    }

    #[test]
    fn recovers_an_additive_pattern_on_a_linear_trend() {
        let series = monthly(36, |i| 100.0 + i as f64 + PATTERN[i % 12]);
        let summary = decompose(&key(), &series, SeasonalModel::Additive, 24).unwrap();
        for (found, expected) in summary.seasonal_indices.iter().zip(PATTERN.iter()) {
            assert!((found - expected).abs() < 1e-9, "{} vs {}", found, expected);
        }
        assert!(summary.seasonal_indices.iter().sum::<f64>().abs() < 1e-9);
        assert_eq!(summary.peak_month, 6);
        assert_eq!(summary.trough_month, 1);
        assert!(summary.seasonal_strength > 0.99);
        assert_eq!(summary.strength_class, "strong");
        assert_eq!(summary.trend[5], None);
        assert!((summary.trend[6].unwrap() - 106.0).abs() < 1e-9);

        let records = seasonality_records(&summary, &BandThresholds::default());
        assert_eq!(records.len(), 36);
        assert_eq!(records[5].classification_band.as_deref(), Some("seasonal peak"));
        assert_eq!(records[0].classification_band.as_deref(), Some("seasonal trough"));
        assert_eq!(records[2].classification_band.as_deref(), Some("neutral"));
    }

    #[test]
    fn multiplicative_indices_average_to_one() {
        let series = monthly(24, |i| (200.0 + 2.0 * i as f64) * (1.0 + PATTERN[i % 12] / 100.0));
        let summary = decompose(&key(), &series, SeasonalModel::Multiplicative, 24).unwrap();
        let mean = summary.seasonal_indices.iter().sum::<f64>() / 12.0;
        assert!((mean - 1.0).abs() < 1e-9);
        assert_eq!(summary.peak_month, 6);
    }

    #[test]
    fn preconditions_are_reported() {
        let short = monthly(23, |_| 10.0);
        assert!(matches!(
            decompose(&key(), &short, SeasonalModel::Additive, 24),
            Err(SeasonalSkip::TooShort { periods: 23, required: 24 })
        ));

        let mut gapped = monthly(30, |_| 10.0);
        gapped.remove(&Period::month(2019, 2).unwrap());
        assert!(matches!(
            decompose(&key(), &gapped, SeasonalModel::Additive, 24),
            Err(SeasonalSkip::NotContiguous { .. })
        ));

        let with_zero = monthly(24, |i| if i == 3 { 0.0 } else { 10.0 });
        assert_eq!(
            decompose(&key(), &with_zero, SeasonalModel::Multiplicative, 24),
            Err(SeasonalSkip::NonPositive)
        );
    }

    #[test]
    fn flat_series_has_no_seasonal_strength() {
        let series = monthly(24, |_| 50.0);
        let summary = decompose(&key(), &series, SeasonalModel::Additive, 24).unwrap();
        assert_eq!(summary.seasonal_strength, 0.0);
        assert_eq!(summary.strength_class, "weak");
    }
}
