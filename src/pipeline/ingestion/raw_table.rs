use std::path::Path;

use crate::error::{EcomapError, Result};

/// Untyped rows read from a delimited file. Transient: consumed by the harmonizer.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows whose field count differs from the header
    pub ragged_rows: usize,
}

impl RawTable {
    pub fn parse(path: &Path, text: &str, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EcomapError::Parse {
                path: path.to_path_buf(),
                message: format!("unreadable header: {}", e),
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut ragged_rows = 0;
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| EcomapError::Parse {
                path: path.to_path_buf(),
                message: format!("row {}: {}", idx + 2, e),
            })?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if record.len() != headers.len() {
                ragged_rows += 1;
            }
            rows.push(record.iter().map(|field| field.to_string()).collect());
        }

        Ok(Self {
            headers,
            rows,
            ragged_rows,
        })
    }

    /// Cell at `column`, empty when the row is shorter than the header.
    pub fn cell<'a>(row: &'a [String], column: usize) -> &'a str {
        row.get(column).map(String::as_str).unwrap_or("")
    }
}
