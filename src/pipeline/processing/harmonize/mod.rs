//! Schema harmonization: raw source files into canonical records.
//!
//! Each file is handled independently and produces exactly one [`SourceReport`],
//! whether it succeeds or fails.

pub mod columns;
pub mod geography;
pub mod mappings;
pub mod numeric;

use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use crate::config::PipelineConfig;
use crate::constants::AGGREGATE_CODE;
use crate::domain::{ActivityCode, CanonicalRecord, Period};
use crate::error::{EcomapError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::{self, RawTable, SourceFile};
use crate::pipeline::quality_report::SourceReport;
use crate::pipeline::utils::StringUtils;

use columns::{resolve_columns, ColumnResolution};
use mappings::{CanonicalField, MappingRegistry, SchemaMapping};
use numeric::{parse_number, NumericCell};

pub const DROP_EMPTY_REGION: &str = "empty_region";
pub const DROP_UNPARSEABLE_PERIOD: &str = "unparseable_period";
pub const DROP_MISSING_ACTIVITY: &str = "missing_activity";

/// Records and report for one harmonized file.
#[derive(Debug, Clone)]
pub struct HarmonizedFile {
    pub records: Vec<CanonicalRecord>,
    pub report: SourceReport,
}

/// Where each row's period comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PeriodSource {
    Column(usize),
    YearMonth { year: usize, month: Option<usize> },
    Default(Period),
}

/// Harmonize one source file. Never fails: file-level errors are captured in the
/// returned report with no records.
pub fn harmonize_file(file: &SourceFile, config: &PipelineConfig, registry: &MappingRegistry) -> HarmonizedFile {
    let span = info_span!("harmonize_file", source_id = %file.source_id, source_type = %file.source_type);
    let _enter = span.enter();
    let started = Instant::now();

    let mut report = SourceReport::new(file);
    let result = ingestion::load_source(file).and_then(|loaded| {
        report.record_load(&loaded);
        harmonize_table(file, &loaded.table, config, registry, &mut report)
    });

    let records = match result {
        Ok(records) => {
            info!(
                records = records.len(),
                dropped = report.dropped_rows,
                malformed = report.malformed_values,
                "Harmonized source file"
            );
            metrics::harmonize::file_processed(file.source_type.as_str());
            metrics::harmonize::records_emitted(records.len());
            records
        }
        Err(e) => {
            warn!(error = %e, "Source file failed harmonization");
            metrics::harmonize::file_failed(e.kind());
            report.fail(&e);
            Vec::new()
        }
    };
    metrics::harmonize::duration(started.elapsed().as_secs_f64());

    HarmonizedFile { records, report }
}

/// Map a raw table onto canonical records, filling the report's counters and notes.
pub fn harmonize_table(
    file: &SourceFile,
    table: &RawTable,
    config: &PipelineConfig,
    registry: &MappingRegistry,
    report: &mut SourceReport,
) -> Result<Vec<CanonicalRecord>> {
    let mapping = registry
        .get(file.source_type)
        .ok_or_else(|| EcomapError::Config(format!("no column mapping for source type {}", file.source_type)))?;

    let resolution = resolve_columns(&table.headers, mapping);
    if let Some(field) = resolution.missing_required.first() {
        return Err(EcomapError::Schema {
            path: file.path.clone(),
            field: field.as_str().to_string(),
        });
    }
    let period_source = resolve_period_source(file, &resolution, config)?;

    report.column_mapping = resolution.applied_mapping();
    describe_resolution(&resolution, mapping, period_source, table, report);

    let region_idx = resolution.index(CanonicalField::Region);
    let activity_idx = resolution.index(mapping.activity_field());
    let value_idx = resolution.index(CanonicalField::Value);
    let activity_required = mapping.spec(mapping.activity_field()).map_or(true, |s| s.required);
    let unit = file.source_type.unit();

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        report.rows_read += 1;

        let region = match region_idx.and_then(|i| config.geography.normalizer.normalize(RawTable::cell(row, i))) {
            Some(region) => region,
            None => {
                report.drop_row(DROP_EMPTY_REGION);
                continue;
            }
        };

        let period = match row_period(row, period_source) {
            Some(period) => period,
            None => {
                report.drop_row(DROP_UNPARSEABLE_PERIOD);
                continue;
            }
        };

        let code = activity_idx
            .map(|i| RawTable::cell(row, i).trim().to_uppercase())
            .filter(|code| !code.is_empty());
        let code = match code {
            Some(code) => code,
            None if !activity_required => AGGREGATE_CODE.to_string(),
            None => {
                report.drop_row(DROP_MISSING_ACTIVITY);
                continue;
            }
        };
        let activity = if file.source_type.is_trade() {
            ActivityCode::Product(code)
        } else {
            ActivityCode::Sector(code)
        };

        let value = match value_idx.map(|i| parse_number(RawTable::cell(row, i), file.locale)) {
            Some(NumericCell::Value(v)) => Some(v),
            Some(NumericCell::Malformed) => {
                report.malformed_values += 1;
                None
            }
            Some(NumericCell::Empty) | None => {
                report.empty_values += 1;
                None
            }
        };

        records.push(CanonicalRecord {
            region_code: region,
            period,
            activity,
            value,
            unit: unit.clone(),
            source_id: file.source_id.clone(),
            source_type: file.source_type,
        });
    }

    report.finish(&records);
    if report.dropped_rows > 0 {
        for (reason, count) in &report.drop_reasons {
            metrics::harmonize::rows_dropped(reason, *count);
        }
    }
    metrics::harmonize::malformed_values(report.malformed_values);

    Ok(records)
}

fn resolve_period_source(
    file: &SourceFile,
    resolution: &ColumnResolution,
    config: &PipelineConfig,
) -> Result<PeriodSource> {
    if let Some(idx) = resolution.index(CanonicalField::Period) {
        return Ok(PeriodSource::Column(idx));
    }
    if let Some(year) = resolution.index(CanonicalField::Year) {
        return Ok(PeriodSource::YearMonth {
            year,
            month: resolution.index(CanonicalField::Month),
        });
    }
    config
        .temporal
        .default_period
        .map(PeriodSource::Default)
        .ok_or_else(|| EcomapError::Schema {
            path: file.path.clone(),
            field: CanonicalField::Period.as_str().to_string(),
        })
}

fn describe_resolution(
    resolution: &ColumnResolution,
    mapping: &SchemaMapping,
    period_source: PeriodSource,
    table: &RawTable,
    report: &mut SourceReport,
) {
    for (field, m) in &resolution.matches {
        if m.distance > 0 {
            report.note(format!(
                "column '{}' matched field '{}' by fuzzy match (distance {})",
                m.header, field, m.distance
            ));
        }
    }
    for header in &resolution.unmapped_headers {
        report.note(format!("dropped unmapped column '{}'", header));
    }
    for field in &resolution.missing_optional {
        let time_field = matches!(field, CanonicalField::Period | CanonicalField::Year | CanonicalField::Month);
        if time_field && !matches!(period_source, PeriodSource::Default(_)) {
            continue;
        }
        if *field == mapping.activity_field() {
            report.note(format!("no {} column; rows recorded under {}", field, AGGREGATE_CODE));
        } else if *field != CanonicalField::Year && *field != CanonicalField::Month {
            report.note(format!("optional field '{}' not found", field));
        }
    }
    if let PeriodSource::Default(period) = period_source {
        report.note(format!("no period columns; using configured default period {}", period));
    }
    if table.ragged_rows > 0 {
        report.note(format!("{} rows had a field count different from the header", table.ragged_rows));
    }
    debug!(mapping = ?report.column_mapping, "Column mapping applied");
}

fn row_period(row: &[String], source: PeriodSource) -> Option<Period> {
    match source {
        PeriodSource::Column(idx) => Period::parse(RawTable::cell(row, idx)),
        PeriodSource::Default(period) => Some(period),
        PeriodSource::YearMonth { year, month } => {
            let base = Period::parse(RawTable::cell(row, year))?;
            let month_cell = month.map(|idx| RawTable::cell(row, idx).trim()).unwrap_or("");
            if month_cell.is_empty() {
                return Some(base);
            }
            Period::from_year_month(base.year, Some(parse_month(month_cell)?))
        }
    }
}

/// Month from `3`, `03`, `3.0`, `março` or `mar`.
fn parse_month(cell: &str) -> Option<u32> {
    let numeric = cell.split('.').next().unwrap_or(cell);
    if let Ok(month) = numeric.parse::<u32>() {
        return (1..=12).contains(&month).then_some(month);
    }
    let folded = StringUtils::fold_accents(cell).to_lowercase();
    Period::parse(&format!("{} 2000", folded)).and_then(|p| p.month)
}
