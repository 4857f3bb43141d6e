use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::ports::{IndicatorOutputPort, IndicatorSourcePort, RecordOutputPort, RecordSourcePort};
use crate::constants::{CLEAN_RECORDS_FILE, INDICATORS_FILE, REJECTED_RECORDS_FILE, TABLES_DIR};
use crate::domain::{ActivityCode, CanonicalRecord, IndicatorRecord, IndicatorType};
use crate::observability::metrics;
use crate::pipeline::processing::aggregate::IndicatorRow;
use crate::pipeline::processing::quality_gate::RejectedRecord;

/// Flat CSV shape of a canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub region_code: String,
    pub period: String,
    pub dimension: String,
    pub activity_code: String,
    pub value: Option<f64>,
    pub unit: String,
    pub source_id: String,
    pub source_type: String,
}

impl From<&CanonicalRecord> for CanonicalRow {
    fn from(record: &CanonicalRecord) -> Self {
        Self {
            region_code: record.region_code.clone(),
            period: record.period.to_string(),
            dimension: record.activity.dimension().to_string(),
            activity_code: record.activity.code().to_string(),
            value: record.value,
            unit: record.unit.to_string(),
            source_id: record.source_id.clone(),
            source_type: record.source_type.to_string(),
        }
    }
}

impl CanonicalRow {
    pub fn to_record(&self) -> Result<CanonicalRecord, String> {
        let activity = match self.dimension.as_str() {
            "sector" => ActivityCode::Sector(self.activity_code.clone()),
            "product" => ActivityCode::Product(self.activity_code.clone()),
            other => return Err(format!("unknown dimension '{}'", other)),
        };
        Ok(CanonicalRecord {
            region_code: self.region_code.clone(),
            period: self.period.parse()?,
            activity,
            value: self.value,
            unit: self.unit.parse()?,
            source_id: self.source_id.clone(),
            source_type: self.source_type.parse()?,
        })
    }
}

/// Canonical columns plus the failing rule. Spelled out because the csv writer
/// cannot serialize flattened structs.
#[derive(Debug, Clone, Serialize)]
struct RejectedRow {
    region_code: String,
    period: String,
    dimension: String,
    activity_code: String,
    value: Option<f64>,
    unit: String,
    source_id: String,
    source_type: String,
    reason: &'static str,
}

impl From<&RejectedRecord> for RejectedRow {
    fn from(rejected: &RejectedRecord) -> Self {
        let row = CanonicalRow::from(&rejected.record);
        Self {
            region_code: row.region_code,
            period: row.period,
            dimension: row.dimension,
            activity_code: row.activity_code,
            value: row.value,
            unit: row.unit,
            source_id: row.source_id,
            source_type: row.source_type,
            reason: rejected.reason.as_str(),
        }
    }
}

/// CSV artifacts in the output directory: clean and rejected records, the indicator
/// table and per-indicator tables.
pub struct FileCsvOutputAdapter {
    directory: PathBuf,
}

impl FileCsvOutputAdapter {
    pub fn new(directory: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create output directory {}", directory.display()))?;
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_rows<T: Serialize>(&self, path: &Path, artifact: &str, rows: &[T]) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = rows.len(), "Wrote {}", artifact);
        metrics::output::file_written(artifact);
        metrics::output::rows_written(artifact, rows.len());
        Ok(())
    }

    fn read_rows<T: DeserializeOwned>(&self, file_name: &str) -> anyhow::Result<Vec<T>> {
        let path = self.directory.join(file_name);
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open {} (run the previous stage first)", path.display()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

#[async_trait::async_trait]
impl RecordOutputPort for FileCsvOutputAdapter {
    async fn write_clean_records(&self, records: &[CanonicalRecord]) -> anyhow::Result<()> {
        let rows: Vec<CanonicalRow> = records.iter().map(CanonicalRow::from).collect();
        self.write_rows(&self.directory.join(CLEAN_RECORDS_FILE), "clean_records", &rows)
    }

    async fn write_rejected_records(&self, rejected: &[RejectedRecord]) -> anyhow::Result<()> {
        let rows: Vec<RejectedRow> = rejected.iter().map(RejectedRow::from).collect();
        self.write_rows(&self.directory.join(REJECTED_RECORDS_FILE), "rejected_records", &rows)
    }
}

#[async_trait::async_trait]
impl RecordSourcePort for FileCsvOutputAdapter {
    async fn read_clean_records(&self) -> anyhow::Result<Vec<CanonicalRecord>> {
        let rows: Vec<CanonicalRow> = self.read_rows(CLEAN_RECORDS_FILE)?;
        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                row.to_record()
                    .map_err(|e| anyhow::anyhow!("{} row {}: {}", CLEAN_RECORDS_FILE, idx + 1, e))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl IndicatorOutputPort for FileCsvOutputAdapter {
    async fn write_indicators(&self, records: &[IndicatorRecord]) -> anyhow::Result<()> {
        let rows: Vec<IndicatorRow> = records.iter().map(IndicatorRow::from).collect();
        self.write_rows(&self.directory.join(INDICATORS_FILE), "indicators", &rows)
    }

    async fn write_tables(&self, tables: &BTreeMap<IndicatorType, Vec<IndicatorRow>>) -> anyhow::Result<()> {
        for (indicator_type, rows) in tables {
            let path = self
                .directory
                .join(TABLES_DIR)
                .join(format!("{}.csv", indicator_type.table_name()));
            self.write_rows(&path, indicator_type.table_name(), rows)?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IndicatorSourcePort for FileCsvOutputAdapter {
    async fn read_indicators(&self) -> anyhow::Result<Vec<IndicatorRecord>> {
        let rows: Vec<IndicatorRow> = self.read_rows(INDICATORS_FILE)?;
        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                row.to_record()
                    .map_err(|e| anyhow::anyhow!("{} row {}: {}", INDICATORS_FILE, idx + 1, e))
            })
            .collect()
    }
}
