use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use ecomap::app::derive_use_case::DeriveUseCase;
use ecomap::app::ingest_use_case::IngestUseCase;
use ecomap::app::report_use_case::ReportUseCase;
use ecomap::config::PipelineConfig;
use ecomap::constants::{
    CLEAN_RECORDS_FILE, DECOMPOSITIONS_FILE, GROWTH_SUMMARY_FILE, INDICATORS_FILE, QUALITY_REPORT_FILE,
    REJECTED_RECORDS_FILE, SUMMARY_FILE, TABLES_DIR,
};
use ecomap::domain::{IndicatorRecord, IndicatorType, Period};
use ecomap::error::EcomapError;
use ecomap::infra::csv_output_adapter::FileCsvOutputAdapter;
use ecomap::infra::json_output_adapter::FileReportOutputAdapter;
use ecomap::pipeline::processing::aggregate::RunSummary;
use ecomap::pipeline::processing::indicators::DecompositionSummary;
use ecomap::pipeline::quality_report::{QualityReport, SourceStatus};
use tempfile::tempdir;

const CONFIG: &str = r#"
[geography]
target_regions = ["Joinville", "Blumenau"]

[temporal]
start = 2020
end = 2021

[indicators]
top_n = 3

[[sources]]
source_type = "rais"
path = "data/rais"

[[sources]]
source_type = "caged"
path = "data/caged"

[[sources]]
source_type = "comexstat"
path = "data/comex"

[output]
directory = "out"
log_directory = "logs"
"#;

/// RAIS-style extract: windows-1252, semicolon separated, pt-BR numbers.
const RAIS: &str = "Município;Ano;Seção;Empregos
Joinville;2020;C;500
Joinville;2020;G;300
Joinville;2020;F;100
Joinville;2021;C;600
Joinville;2021;G;300
Joinville;2021;F;100
Blumenau;2020;C;250
Blumenau;2020;G;-5
Blumenau;2020;F;300
Blumenau;2021;C;200
Blumenau;2021;G;500
Blumenau;2021;F;300
Lages;2021;C;10
Joinville;2019;C;450
Joinville;2021;C;600
";

const COMEX: &str = "co_ano;municipio;sh4;vl_fob
2021;Joinville;0901;100
2021;Joinville;8501;900
2021;Blumenau;0901;300
2021;Blumenau;8501;100
";

fn write_fixtures(root: &Path) -> Result<()> {
    for dir in ["data/rais", "data/caged", "data/comex"] {
        fs::create_dir_all(root.join(dir))?;
    }
    fs::write(root.join("ecomap.toml"), CONFIG)?;

    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(RAIS);
    fs::write(root.join("data/rais/sc_rais.csv"), &encoded)?;
    // Sorts after the valid extract and carries no recognizable columns
    fs::write(root.join("data/rais/zz_layout_changed.csv"), "foo;bar;baz\n1;2;3\n")?;

    let seasonal = [5, -3, 8, 0, -6, 2, 4, -8, 1, 3, -2, -4];
    let mut caged = String::from("ano;mes;municipio;secao;saldo\n");
    for year in [2020, 2021] {
        for (idx, swing) in seasonal.iter().enumerate() {
            let level = 100 + (year - 2020) * 12 + idx as i32;
            caged.push_str(&format!("{};{};Joinville;C;{}\n", year, idx + 1, level + swing));
        }
    }
    fs::write(root.join("data/caged/caged_joinville.csv"), caged)?;

    fs::write(root.join("data/comex/exports_2021.csv"), COMEX)?;
    Ok(())
}

fn find<'a>(
    records: &'a [IndicatorRecord],
    indicator_type: IndicatorType,
    region: &str,
    code: Option<&str>,
    period: Period,
) -> &'a IndicatorRecord {
    records
        .iter()
        .find(|r| {
            r.indicator_type == indicator_type
                && r.region_code == region
                && r.sector_or_product_code.as_deref() == code
                && r.period == period
        })
        .unwrap_or_else(|| panic!("missing {} record for {} {:?} {}", indicator_type, region, code, period))
}

fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.map_or(false, |v| (v - expected).abs() < 1e-9)
}

#[tokio::test]
async fn staged_run_produces_every_artifact() -> Result<()> {
    let temp_dir = tempdir()?;
    write_fixtures(temp_dir.path())?;
    let config = Arc::new(PipelineConfig::load(&temp_dir.path().join("ecomap.toml"))?);
    let out = config.output.directory.clone();

    // Ingest
    let ingest = IngestUseCase::with_default_quality_gate(
        Arc::clone(&config),
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileReportOutputAdapter::new(&out)?),
    );
    let ingested = ingest.execute("integration-run").await?;

    let report = &ingested.report;
    assert_eq!(report.sources.len(), 4);
    assert_eq!(report.totals.files_processed, 4);
    assert_eq!(report.totals.files_failed, 1);

    let rais = &report.sources[0];
    assert!(rais.source_id.ends_with("sc_rais.csv"));
    assert_eq!(rais.status, SourceStatus::Ok);
    assert_eq!(rais.encoding.as_deref(), Some("windows-1252"));
    assert_eq!(rais.rows_read, 15);

    let broken = &report.sources[1];
    assert_eq!(broken.status, SourceStatus::Failed);
    assert_eq!(broken.error_kind.as_deref(), Some("schema_error"));
    assert_eq!(broken.records_emitted, 0);

    assert_eq!(report.rejections_by_reason["out_of_scope_region"], 1);
    assert_eq!(report.rejections_by_reason["outside_temporal_window"], 1);
    assert_eq!(report.rejections_by_reason["negative_value"], 1);
    assert_eq!(report.rejections_by_reason["duplicate_key"], 1);
    assert_eq!(report.totals.records_rejected, 4);
    assert_eq!(report.totals.records_clean, 11 + 24 + 4);
    assert!(report.totals.quality_score > 0.0 && report.totals.quality_score <= 1.0);

    assert!(out.join(CLEAN_RECORDS_FILE).exists());
    assert!(out.join(REJECTED_RECORDS_FILE).exists());
    assert!(out.join(QUALITY_REPORT_FILE).exists());

    // Derive, reading the clean dataset back from disk
    let derive = DeriveUseCase::new(
        Arc::clone(&config),
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileReportOutputAdapter::new(&out)?),
    );
    let derived = derive.execute_from_store("unused-run-id").await?;
    assert_eq!(derived.report.run_id, "integration-run");

    let records = &derived.indicators;
    let y2021 = Period::year(2021);

    // Joinville C: 600/1000 against 800/2000 nationally
    let lq = find(records, IndicatorType::LocationQuotient, "Joinville", Some("C"), y2021);
    assert!(approx(lq.value, 1.5));
    assert_eq!(lq.classification_band.as_deref(), Some("high specialization"));

    // Joinville 0901: 100/1000 against 400/1400
    let rca = find(records, IndicatorType::RevealedComparativeAdvantage, "Joinville", Some("0901"), y2021);
    assert!(approx(rca.value, 0.1 / (400.0 / 1400.0)));

    let hhi = find(records, IndicatorType::HerfindahlHirschman, "Joinville", None, y2021);
    assert!(approx(hhi.value, 0.36 + 0.09 + 0.01));

    let growth = find(records, IndicatorType::Growth, "Joinville", Some("C"), y2021);
    assert!(approx(growth.value, 0.2));
    let total_growth = find(records, IndicatorType::Growth, "Joinville", None, y2021);
    assert!(approx(total_growth.value, 100.0 / 900.0));

    assert!(records.iter().any(|r| r.indicator_type == IndicatorType::Seasonality));
    assert!(records
        .iter()
        .filter(|r| r.classification_band.is_some())
        .all(|r| r.value.is_some()));

    let decompositions: Vec<DecompositionSummary> =
        serde_json::from_str(&fs::read_to_string(out.join(DECOMPOSITIONS_FILE))?)?;
    let caged = decompositions
        .iter()
        .find(|d| d.region_code == "Joinville" && d.sector_or_product_code.as_deref() == Some("C"))
        .expect("decomposition for Joinville C");
    assert_eq!(caged.periods.len(), 24);
    assert_eq!(caged.seasonal_indices.len(), 12);
    assert!(out.join(GROWTH_SUMMARY_FILE).exists());
    assert!(out.join(INDICATORS_FILE).exists());

    let stored: QualityReport = serde_json::from_str(&fs::read_to_string(out.join(QUALITY_REPORT_FILE))?)?;
    assert_eq!(stored.totals.indicator_records, records.len());
    assert_eq!(stored.totals.files_failed, 1);

    // Report
    let report_stage = ReportUseCase::new(
        config.indicators.top_n,
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileReportOutputAdapter::new(&out)?),
    );
    let summary = report_stage.execute_from_store().await?;
    assert_eq!(summary.run_id.as_deref(), Some("integration-run"));

    for table in ["lq", "rca", "hhi", "growth", "seasonality"] {
        assert!(out.join(TABLES_DIR).join(format!("{}.csv", table)).exists(), "missing {} table", table);
    }

    let written: RunSummary = serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE))?)?;
    let lq_summary = written
        .indicators
        .iter()
        .find(|s| s.indicator_type == IndicatorType::LocationQuotient)
        .expect("LQ summary");
    assert_eq!(lq_summary.latest_period, Some(y2021));
    assert!(lq_summary.top.len() <= 3);
    assert_eq!(lq_summary.top[0].rank, 1);
    assert!(lq_summary.top.windows(2).all(|w| w[0].value >= w[1].value));

    Ok(())
}

#[tokio::test]
async fn missing_sources_abort_the_run() -> Result<()> {
    let temp_dir = tempdir()?;
    fs::write(temp_dir.path().join("ecomap.toml"), CONFIG)?;
    let config = Arc::new(PipelineConfig::load(&temp_dir.path().join("ecomap.toml"))?);
    let out = config.output.directory.clone();

    let ingest = IngestUseCase::with_default_quality_gate(
        Arc::clone(&config),
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileReportOutputAdapter::new(&out)?),
    );
    let err = ingest.execute("empty-run").await.unwrap_err();
    assert!(matches!(err.downcast_ref::<EcomapError>(), Some(EcomapError::NoSourceFiles(_))));
    assert!(!out.join(QUALITY_REPORT_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn file_without_period_uses_configured_default() -> Result<()> {
    let temp_dir = tempdir()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data"))?;
    fs::write(root.join("data/joinville.csv"), "municipio;setor;empregos\nJoinville;C;1.234\n")?;
    let config = PipelineConfig::from_toml_str(
        r#"
[geography]
target_regions = ["Joinville"]

[temporal]
start = 2020
end = 2024
default_period = 2022

[[sources]]
source_type = "employment-stock"
path = "data"
"#,
        root,
    )?;
    let config = Arc::new(config);
    let out = config.output.directory.clone();

    let ingest = IngestUseCase::with_default_quality_gate(
        Arc::clone(&config),
        Box::new(FileCsvOutputAdapter::new(&out)?),
        Box::new(FileReportOutputAdapter::new(&out)?),
    );
    let ingested = ingest.execute("default-period").await?;

    assert_eq!(ingested.clean.len(), 1);
    let record = &ingested.clean[0];
    assert_eq!(record.region_code, "Joinville");
    assert_eq!(record.period, Period::year(2022));
    assert_eq!(record.value, Some(1234.0));
    assert!(ingested.report.sources[0]
        .notes
        .iter()
        .any(|n| n.contains("default period")));
    Ok(())
}
