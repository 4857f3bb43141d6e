use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::bands::BandThresholds;
use super::SeriesKey;
use crate::domain::{IndicatorRecord, IndicatorType, Metric, Period};

/// A growth value left null because the preceding period is missing from the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthGap {
    pub metric: Metric,
    pub region_code: String,
    pub sector_or_product_code: Option<String>,
    pub period: Period,
    pub missing_period: Period,
}

/// Whole-series growth statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    pub metric: Metric,
    pub region_code: String,
    pub sector_or_product_code: Option<String>,
    pub granularity: String,
    pub first_period: Period,
    pub last_period: Period,
    pub observations: usize,
    pub first_value: f64,
    pub last_value: f64,
    /// `(last - first) / first`
    pub total_growth: Option<f64>,
    /// Compound annual growth rate between first and last observation
    pub cagr: Option<f64>,
    pub mean_growth: Option<f64>,
    /// Sample standard deviation of the defined period-over-period rates
    pub volatility: Option<f64>,
}

/// `(current - previous) / previous`, null for a zero predecessor.
pub fn growth_rate(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeriesGrowth {
    pub records: Vec<IndicatorRecord>,
    pub gaps: Vec<GrowthGap>,
    pub summary: Option<GrowthSummary>,
}

/// Period-over-period growth for one series. The first observation gets no record;
/// a period whose predecessor is absent gets a null record and a gap entry.
pub fn series_growth(key: &SeriesKey, series: &BTreeMap<Period, f64>, thresholds: &BandThresholds) -> SeriesGrowth {
    let mut out = SeriesGrowth::default();
    let mut rates = Vec::new();

    for (period, value) in series.iter().skip(1) {
        let previous = period.previous();
        let rate = match series.get(&previous) {
            Some(prev) => growth_rate(*prev, *value),
            None => {
                out.gaps.push(GrowthGap {
                    metric: key.metric,
                    region_code: key.region_code.clone(),
                    sector_or_product_code: key.code.clone(),
                    period: *period,
                    missing_period: previous,
                });
                None
            }
        };
        if let Some(r) = rate {
            rates.push(r);
        }

        out.records.push(IndicatorRecord {
            indicator_type: IndicatorType::Growth,
            metric: key.metric,
            region_code: key.region_code.clone(),
            sector_or_product_code: key.code.clone(),
            period: *period,
            value: rate,
            classification_band: rate.map(|r| thresholds.growth(r).to_string()),
        });
    }

    out.summary = summarize(key, series, &rates);
    out
}

fn summarize(key: &SeriesKey, series: &BTreeMap<Period, f64>, rates: &[f64]) -> Option<GrowthSummary> {
    let (first_period, first_value) = series.iter().next()?;
    let (last_period, last_value) = series.iter().next_back()?;

    let years = (last_period.first_month_index() - first_period.first_month_index()) as f64 / 12.0;
    let cagr = if *first_value > 0.0 && *last_value >= 0.0 && years > 0.0 {
        Some((last_value / first_value).powf(1.0 / years) - 1.0)
    } else {
        None
    };

    let mean_growth = (!rates.is_empty()).then(|| rates.iter().sum::<f64>() / rates.len() as f64);
    let volatility = if rates.len() >= 2 {
        let mean = mean_growth.unwrap_or(0.0);
        let var = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (rates.len() - 1) as f64;
        Some(var.sqrt())
    } else {
        None
    };

    Some(GrowthSummary {
        metric: key.metric,
        region_code: key.region_code.clone(),
        sector_or_product_code: key.code.clone(),
        granularity: if first_period.is_monthly() { "monthly" } else { "yearly" }.to_string(),
        first_period: *first_period,
        last_period: *last_period,
        observations: series.len(),
        first_value: *first_value,
        last_value: *last_value,
        total_growth: growth_rate(*first_value, *last_value),
        cagr,
        mean_growth,
        volatility,
    })
}
