use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EcomapError {
    #[error("Encoding error in {path}: {message}")]
    Encoding { path: PathBuf, message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Schema error in {path}: required field '{field}' has no matching column")]
    Schema { path: PathBuf, field: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("No source files found: {0}")]
    NoSourceFiles(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EcomapError {
    /// Errors scoped to a single source file. The orchestrator records these in the
    /// quality report and keeps going with the remaining files.
    pub fn is_file_scoped(&self) -> bool {
        matches!(
            self,
            EcomapError::Encoding { .. } | EcomapError::Parse { .. } | EcomapError::Schema { .. }
        )
    }

    /// Short machine-readable kind used in reports and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            EcomapError::Encoding { .. } => "encoding_error",
            EcomapError::Parse { .. } => "parse_error",
            EcomapError::Schema { .. } => "schema_error",
            EcomapError::Config(_) => "config_error",
            EcomapError::MissingField(_) => "missing_field",
            EcomapError::NoSourceFiles(_) => "no_source_files",
            EcomapError::Csv(_) => "csv_error",
            EcomapError::Json(_) => "json_error",
            EcomapError::Toml(_) => "toml_error",
            EcomapError::Io(_) => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, EcomapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_scoped_errors_are_distinguished_from_fatal_ones() {
        let schema = EcomapError::Schema {
            path: PathBuf::from("rais.csv"),
            field: "region".to_string(),
        };
        assert!(schema.is_file_scoped());
        assert_eq!(schema.kind(), "schema_error");
        assert!(schema.to_string().contains("'region'"));

        let fatal = EcomapError::MissingField("temporal.start".to_string());
        assert!(!fatal.is_file_scoped());
    }
}
