// Pipeline ingestion: source discovery, decoding, delimiter detection and raw tables

pub mod decode;
pub mod delimiter;
pub mod raw_table;

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::SourceEntry;
use crate::domain::SourceType;
use crate::error::{EcomapError, Result};
use crate::pipeline::processing::harmonize::numeric::NumericLocale;

pub use raw_table::RawTable;

/// One file scheduled for harmonization.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Stable identity used as `source_id` on every record from this file
    pub source_id: String,
    pub source_type: SourceType,
    pub locale: NumericLocale,
    pub encodings: Vec<&'static Encoding>,
}

/// A source file read into memory and split into raw rows.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub table: RawTable,
    pub encoding: &'static str,
    pub encoding_detection: &'static str,
    pub delimiter: u8,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Expand configured source entries into concrete files, in configuration order and
/// then by file name. Missing paths are logged and skipped.
pub fn discover_files(entries: &[SourceEntry]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();

    for entry in entries {
        let paths = if entry.path.is_file() {
            vec![entry.path.clone()]
        } else if entry.path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(&entry.path)?
                .filter_map(|dir_entry| dir_entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && has_extension(path, &entry.extensions))
                .collect();
            found.sort();
            found
        } else {
            warn!(path = %entry.path.display(), source_type = %entry.source_type, "Source path does not exist");
            Vec::new()
        };

        debug!(path = %entry.path.display(), count = paths.len(), "Discovered source files");
        files.extend(paths.into_iter().map(|path| SourceFile {
            source_id: path.display().to_string(),
            path,
            source_type: entry.source_type,
            locale: entry.locale,
            encodings: entry.encodings.clone(),
        }));
    }

    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Read, fingerprint, decode and split a source file.
pub fn load_source(file: &SourceFile) -> Result<LoadedSource> {
    let bytes = fs::read(&file.path)?;
    let sha256 = hex::encode(Sha256::digest(&bytes));

    let decoded = decode::decode_bytes(&file.path, &bytes, &file.encodings)?;
    let text = decoded.text.trim_start_matches('\u{feff}');

    let delimiter = delimiter::detect_delimiter(text).ok_or_else(|| EcomapError::Parse {
        path: file.path.clone(),
        message: if text.trim().is_empty() {
            "file is empty".to_string()
        } else {
            "no consistent field delimiter found (tried , ; tab |)".to_string()
        },
    })?;

    let table = RawTable::parse(&file.path, text, delimiter)?;

    Ok(LoadedSource {
        table,
        encoding: decoded.encoding,
        encoding_detection: decoded.detection,
        delimiter,
        sha256,
        size_bytes: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(path: PathBuf) -> SourceEntry {
        SourceEntry {
            source_type: SourceType::EmploymentStock,
            path,
            locale: NumericLocale::PtBr,
            encodings: vec![encoding_rs::UTF_8, encoding_rs::WINDOWS_1252],
            extensions: vec!["csv".to_string()],
        }
    }

    #[test]
    fn discovers_matching_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "notes.md"] {
            fs::write(dir.path().join(name), "x,y\n1,2\n").unwrap();
        }
        let files = discover_files(&[entry(dir.path().to_path_buf())]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);

        let missing = discover_files(&[entry(dir.path().join("nope"))]).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn loads_and_fingerprints_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("municipio;setor;empregos\nJoinville;C;1.234\n".as_bytes()).unwrap();
        let source = SourceFile {
            path: file.path().to_path_buf(),
            source_id: "rais".into(),
            source_type: SourceType::EmploymentStock,
            locale: NumericLocale::PtBr,
            encodings: vec![encoding_rs::UTF_8],
        };
        let loaded = load_source(&source).unwrap();
        assert_eq!(loaded.delimiter, b';');
        assert_eq!(loaded.encoding, "UTF-8");
        assert_eq!(loaded.sha256.len(), 64);
        assert_eq!(loaded.table.rows.len(), 1);
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = SourceFile {
            path: file.path().to_path_buf(),
            source_id: "empty".into(),
            source_type: SourceType::Gdp,
            locale: NumericLocale::PtBr,
            encodings: vec![encoding_rs::UTF_8],
        };
        let err = load_source(&source).unwrap_err();
        assert_eq!(err.kind(), "parse_error");
    }
}
