use std::path::Path;

use ecomap::config::PipelineConfig;
use ecomap::domain::{ActivityCode, CanonicalRecord, IndicatorRecord, IndicatorType, Metric, Period, SourceType};
use ecomap::pipeline::processing::indicators::concentration::hhi;
use ecomap::pipeline::processing::indicators::growth::growth_rate;
use ecomap::pipeline::processing::indicators::{compute_indicators, IndicatorOutput};

fn config(national_reference: Option<&str>) -> PipelineConfig {
    let mut text = String::from("[geography]\ntarget_regions = [\"Joinville\", \"Blumenau\"]\n");
    if let Some(reference) = national_reference {
        text.push_str(&format!("national_reference = \"{}\"\n", reference));
    }
    text.push_str("[temporal]\nstart = 2015\nend = 2024\n[[sources]]\nsource_type = \"rais\"\npath = \"data\"\n");
    PipelineConfig::from_toml_str(&text, Path::new(".")).unwrap()
}

fn record(source_type: SourceType, region: &str, code: &str, period: Period, value: f64) -> CanonicalRecord {
    let activity = if source_type.is_trade() {
        ActivityCode::Product(code.into())
    } else {
        ActivityCode::Sector(code.into())
    };
    CanonicalRecord {
        region_code: region.into(),
        period,
        activity,
        value: Some(value),
        unit: source_type.unit(),
        source_id: format!("{}.csv", source_type),
        source_type,
    }
}

fn employment(region: &str, code: &str, year: i32, value: f64) -> CanonicalRecord {
    record(SourceType::EmploymentStock, region, code, Period::year(year), value)
}

fn values_of(output: &IndicatorOutput, indicator_type: IndicatorType) -> Vec<(String, Option<String>, Option<f64>)> {
    let mut values: Vec<_> = output
        .records
        .iter()
        .filter(|r| r.indicator_type == indicator_type)
        .map(|r| (r.region_code.clone(), r.sector_or_product_code.clone(), r.value))
        .collect();
    values.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    values
}

fn one<'a>(
    output: &'a IndicatorOutput,
    indicator_type: IndicatorType,
    region: &str,
    code: Option<&str>,
) -> &'a IndicatorRecord {
    output
        .records
        .iter()
        .find(|r| {
            r.indicator_type == indicator_type
                && r.region_code == region
                && r.sector_or_product_code.as_deref() == code
        })
        .unwrap()
}

fn base_employment() -> Vec<CanonicalRecord> {
    vec![
        employment("Joinville", "C", 2021, 600.0),
        employment("Joinville", "G", 2021, 300.0),
        employment("Joinville", "F", 2021, 100.0),
        employment("Blumenau", "C", 2021, 200.0),
        employment("Blumenau", "G", 2021, 500.0),
        employment("Blumenau", "F", 2021, 300.0),
    ]
}

#[test]
fn location_quotient_is_scale_invariant() {
    let cfg = config(None);
    let base = compute_indicators(&base_employment(), &cfg);

    let scaled: Vec<CanonicalRecord> = base_employment()
        .into_iter()
        .map(|mut r| {
            r.value = r.value.map(|v| v * 7.0);
            r
        })
        .collect();
    let scaled = compute_indicators(&scaled, &cfg);

    let a = values_of(&base, IndicatorType::LocationQuotient);
    let b = values_of(&scaled, IndicatorType::LocationQuotient);
    assert_eq!(a.len(), 6);
    for (left, right) in a.iter().zip(&b) {
        assert_eq!((&left.0, &left.1), (&right.0, &right.1));
        assert!((left.2.unwrap() - right.2.unwrap()).abs() < 1e-12);
    }
}

#[test]
fn national_reference_supplies_the_denominator() {
    let mut records = base_employment();
    records.push(employment("Santa Catarina", "C", 2021, 1000.0));
    records.push(employment("Santa Catarina", "G", 2021, 3000.0));
    records.push(employment("Santa Catarina", "F", 2021, 1000.0));
    let output = compute_indicators(&records, &config(Some("SC")));

    // 600/1000 against 1000/5000
    let lq = one(&output, IndicatorType::LocationQuotient, "Joinville", Some("C"));
    assert!((lq.value.unwrap() - 3.0).abs() < 1e-12);
    assert!(!output
        .records
        .iter()
        .any(|r| r.indicator_type == IndicatorType::LocationQuotient && r.region_code == "Santa Catarina"));
}

#[test]
fn missing_export_data_skips_comparative_advantage() {
    let output = compute_indicators(&base_employment(), &config(None));
    assert_eq!(output.count_of(IndicatorType::RevealedComparativeAdvantage), 0);
    let skipped = output
        .diagnostics
        .skipped
        .iter()
        .find(|s| s.indicator_type == IndicatorType::RevealedComparativeAdvantage)
        .unwrap();
    assert_eq!(skipped.metric, Metric::Exports);
    assert_eq!(skipped.reason, "no exports observations");
}

#[test]
fn concentration_index_bounds() {
    assert_eq!(hhi(&[42.0]), Some(1.0));
    let even = hhi(&[10.0, 10.0, 10.0, 10.0]).unwrap();
    assert!((even - 0.25).abs() < 1e-12);
    assert_eq!(hhi(&[0.0, 0.0]), None);

    let shares = [50.0, 30.0, 20.0];
    let reversed = [20.0, 30.0, 50.0];
    let value = hhi(&shares).unwrap();
    assert!((value - 0.38).abs() < 1e-12);
    assert!((value - hhi(&reversed).unwrap()).abs() < 1e-12);
    assert!(value >= 1.0 / 3.0 && value <= 1.0);

    let mut records = base_employment();
    records.push(employment("Joinville", "TOTAL", 2021, 1000.0));
    let output = compute_indicators(&records, &config(None));
    let joinville = one(&output, IndicatorType::HerfindahlHirschman, "Joinville", None);
    assert!((joinville.value.unwrap() - 0.46).abs() < 1e-12);
    assert_eq!(joinville.classification_band.as_deref(), Some("high concentration"));
}

#[test]
fn growth_edge_cases() {
    assert_eq!(growth_rate(100.0, 0.0), Some(-1.0));
    assert_eq!(growth_rate(0.0, 50.0), None);

    let records = vec![
        employment("Joinville", "C", 2019, 0.0),
        employment("Joinville", "C", 2020, 50.0),
        employment("Joinville", "C", 2022, 60.0),
    ];
    let output = compute_indicators(&records, &config(None));
    let growth: Vec<_> = output
        .records
        .iter()
        .filter(|r| r.indicator_type == IndicatorType::Growth && r.sector_or_product_code.as_deref() == Some("C"))
        .map(|r| (r.period, r.value))
        .collect();
    assert_eq!(growth, vec![(Period::year(2020), None), (Period::year(2022), None)]);

    let gap = &output.diagnostics.gaps[0];
    assert_eq!(gap.period, Period::year(2022));
    assert_eq!(gap.missing_period, Period::year(2021));
}

#[test]
fn direct_counts_win_over_aggregator_figures() {
    let records = vec![
        employment("Joinville", "C", 2021, 600.0),
        record(SourceType::SectorActivity, "Joinville", "C", Period::year(2021), 640.0),
        employment("Joinville", "G", 2021, 400.0),
    ];
    let output = compute_indicators(&records, &config(None));

    assert_eq!(output.diagnostics.conflicts.len(), 1);
    let conflict = &output.diagnostics.conflicts[0];
    assert_eq!(conflict.kept_source_type, SourceType::EmploymentStock);
    assert_eq!(conflict.kept_value, 600.0);
    assert_eq!(conflict.discarded_value, 640.0);

    let hhi = one(&output, IndicatorType::HerfindahlHirschman, "Joinville", None);
    assert!((hhi.value.unwrap() - (0.36 + 0.16)).abs() < 1e-12);
}

#[test]
fn short_monthly_series_is_not_decomposed() {
    let records: Vec<CanonicalRecord> = (1..=12)
        .map(|month| {
            record(
                SourceType::EmploymentFlow,
                "Joinville",
                "C",
                Period::month(2021, month).unwrap(),
                10.0 * month as f64,
            )
        })
        .collect();
    let output = compute_indicators(&records, &config(None));

    assert!(output.decompositions.is_empty());
    assert_eq!(output.count_of(IndicatorType::Seasonality), 0);
    assert!(output
        .diagnostics
        .skipped
        .iter()
        .any(|s| s.indicator_type == IndicatorType::Seasonality && s.reason.starts_with("insufficient history")));
}

#[test]
fn band_is_present_exactly_when_value_is() {
    let mut records = base_employment();
    records.push(employment("Joinville", "C", 2020, 0.0));
    records.push(employment("Blumenau", "C", 2020, 0.0));
    let output = compute_indicators(&records, &config(None));
    assert!(output.records.iter().any(|r| r.value.is_none()));
    assert!(output
        .records
        .iter()
        .all(|r| r.value.is_some() == r.classification_band.is_some()));
}
