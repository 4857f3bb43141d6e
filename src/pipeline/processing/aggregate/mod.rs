//! Row-oriented tables and per-indicator summary statistics for external consumers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{IndicatorRecord, IndicatorType, Period};

/// Flat CSV row for an indicator record. Column names are stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub indicator_type: String,
    pub metric: String,
    pub region_code: String,
    pub sector_or_product_code: Option<String>,
    pub period: String,
    pub value: Option<f64>,
    pub classification_band: Option<String>,
}

impl From<&IndicatorRecord> for IndicatorRow {
    fn from(record: &IndicatorRecord) -> Self {
        Self {
            indicator_type: record.indicator_type.as_str().to_string(),
            metric: record.metric.as_str().to_string(),
            region_code: record.region_code.clone(),
            sector_or_product_code: record.sector_or_product_code.clone(),
            period: record.period.to_string(),
            value: record.value,
            classification_band: record.classification_band.clone(),
        }
    }
}

impl IndicatorRow {
    /// Parse a row read back from `indicators.csv`.
    pub fn to_record(&self) -> Result<IndicatorRecord, String> {
        let band = self.classification_band.clone().filter(|b| !b.is_empty());
        Ok(IndicatorRecord {
            indicator_type: self.indicator_type.parse()?,
            metric: self.metric.parse()?,
            region_code: self.region_code.clone(),
            sector_or_product_code: self.sector_or_product_code.clone().filter(|c| !c.is_empty()),
            period: self.period.parse()?,
            value: self.value,
            classification_band: band,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedValue {
    pub rank: usize,
    pub metric: String,
    pub region_code: String,
    pub sector_or_product_code: Option<String>,
    pub value: f64,
    pub classification_band: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub indicator_type: IndicatorType,
    pub total_records: usize,
    pub computed: usize,
    pub null_values: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub band_counts: BTreeMap<String, usize>,
    /// Latest period carrying a computed value; the ranking is taken there
    pub latest_period: Option<Period>,
    pub top: Vec<RankedValue>,
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub top_n: usize,
    pub indicators: Vec<IndicatorSummary>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatedIndicators {
    pub tables: BTreeMap<IndicatorType, Vec<IndicatorRow>>,
    pub summaries: Vec<IndicatorSummary>,
}

/// Split records into per-type tables and summarize each type present.
pub fn aggregate(records: &[IndicatorRecord], top_n: usize) -> AggregatedIndicators {
    let mut grouped: BTreeMap<IndicatorType, Vec<&IndicatorRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.indicator_type).or_default().push(record);
    }

    let mut out = AggregatedIndicators::default();
    for (indicator_type, group) in grouped {
        out.summaries.push(summarize(indicator_type, &group, top_n));
        out.tables
            .insert(indicator_type, group.iter().map(|r| IndicatorRow::from(*r)).collect());
    }
    out
}

pub fn summarize(indicator_type: IndicatorType, records: &[&IndicatorRecord], top_n: usize) -> IndicatorSummary {
    let values: Vec<f64> = records.iter().filter_map(|r| r.value).collect();
    let min = values.iter().copied().min_by(f64::total_cmp);
    let max = values.iter().copied().max_by(f64::total_cmp);
    let mean = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);

    let mut band_counts = BTreeMap::new();
    for band in records.iter().filter_map(|r| r.classification_band.as_ref()) {
        *band_counts.entry(band.clone()).or_insert(0) += 1;
    }

    let latest_period = records.iter().filter(|r| r.is_computed()).map(|r| r.period).max();
    let mut latest: Vec<(&IndicatorRecord, f64)> = records
        .iter()
        .filter(|r| Some(r.period) == latest_period)
        .filter_map(|r| r.value.map(|v| (*r, v)))
        .collect();
    latest.sort_by(|(a, va), (b, vb)| {
        vb.total_cmp(va)
            .then_with(|| a.region_code.cmp(&b.region_code))
            .then_with(|| a.sector_or_product_code.cmp(&b.sector_or_product_code))
            .then_with(|| a.metric.cmp(&b.metric))
    });
    let top = latest
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, (record, value))| RankedValue {
            rank: idx + 1,
            metric: record.metric.as_str().to_string(),
            region_code: record.region_code.clone(),
            sector_or_product_code: record.sector_or_product_code.clone(),
            value,
            classification_band: record.classification_band.clone(),
        })
        .collect();

    IndicatorSummary {
        indicator_type,
        total_records: records.len(),
        computed: values.len(),
        null_values: records.len() - values.len(),
        min,
        max,
        mean,
        band_counts,
        latest_period,
        top,
    }
}
