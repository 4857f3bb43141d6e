//! Run configuration.
//!
//! The TOML file is deserialized into loosely-typed `Raw*` structs and then validated
//! into an immutable [`PipelineConfig`] that every stage receives by reference.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::constants::{AGGREGATE_CODE, DEFAULT_EXTENSIONS};
use crate::domain::{Period, SourceType};
use crate::error::{EcomapError, Result};
use crate::pipeline::processing::harmonize::geography::RegionNormalizer;
use crate::pipeline::processing::harmonize::numeric::NumericLocale;
use crate::pipeline::processing::indicators::bands::BandThresholds;
use crate::pipeline::processing::indicators::seasonal::SeasonalModel;

pub const DEFAULT_CONFIG_PATH: &str = "ecomap.toml";
pub const CONFIG_ENV_VAR: &str = "ECOMAP_CONFIG";

/// Default source precedence for cross-source reconciliation: direct stock
/// counts beat aggregator figures, which beat everything else.
pub const DEFAULT_SOURCE_PRECEDENCE: [SourceType; 5] = [
    SourceType::EmploymentStock,
    SourceType::SectorActivity,
    SourceType::EmploymentFlow,
    SourceType::Gdp,
    SourceType::TradeExport,
];

const DEFAULT_MIN_COVERAGE: f64 = 0.8;
const DEFAULT_TOP_N: usize = 10;
const MIN_SEASONAL_PERIODS: usize = 24;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub geography: GeographyConfig,
    pub temporal: TemporalConfig,
    pub thresholds: BandThresholds,
    pub quality: QualityConfig,
    pub indicators: IndicatorConfig,
    pub sources: Vec<SourceEntry>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct GeographyConfig {
    /// Canonical names of the regions in scope
    pub target_regions: BTreeSet<String>,
    /// Canonical name of the national/state reference region, always in scope
    pub national_reference: Option<String>,
    pub normalizer: RegionNormalizer,
}

impl GeographyConfig {
    /// Target regions plus the national reference
    pub fn allowed_regions(&self) -> BTreeSet<String> {
        let mut allowed = self.target_regions.clone();
        allowed.extend(self.national_reference.iter().cloned());
        allowed
    }
}

#[derive(Debug, Clone)]
pub struct TemporalConfig {
    pub start: Period,
    pub end: Period,
    /// Applied to files that carry no period or year columns
    pub default_period: Option<Period>,
}

#[derive(Debug, Clone)]
pub struct QualityConfig {
    pub min_coverage: f64,
    pub expected_sectors: Option<BTreeSet<String>>,
    pub expected_products: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub seasonal_model: SeasonalModel,
    pub min_seasonal_periods: usize,
    pub top_n: usize,
    /// Highest precedence first; always lists every source type
    pub source_precedence: Vec<SourceType>,
}

impl IndicatorConfig {
    /// Lower rank wins.
    pub fn precedence_rank(&self, source_type: SourceType) -> usize {
        self.source_precedence
            .iter()
            .position(|t| *t == source_type)
            .unwrap_or(self.source_precedence.len())
    }
}

#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub source_type: SourceType,
    /// A directory (scanned non-recursively) or a single file
    pub path: PathBuf,
    pub locale: NumericLocale,
    /// Candidate encodings in priority order
    pub encodings: Vec<&'static Encoding>,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub log_directory: PathBuf,
}

// Raw TOML shape

#[derive(Debug, Deserialize)]
struct RawConfig {
    geography: Option<RawGeography>,
    temporal: Option<RawTemporal>,
    #[serde(default)]
    thresholds: BandThresholds,
    #[serde(default)]
    quality: RawQuality,
    #[serde(default)]
    indicators: RawIndicators,
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    output: RawOutput,
}

#[derive(Debug, Deserialize)]
struct RawGeography {
    target_regions: Option<Vec<String>>,
    national_reference: Option<String>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawTemporal {
    start: Option<RawPeriod>,
    end: Option<RawPeriod>,
    default_period: Option<RawPeriod>,
}

/// Periods may be written as `2021` or `"2021-03"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPeriod {
    Year(i64),
    Text(String),
}

impl RawPeriod {
    fn resolve(&self, field: &str) -> Result<Period> {
        let text = match self {
            RawPeriod::Year(y) => y.to_string(),
            RawPeriod::Text(s) => s.clone(),
        };
        Period::parse(&text)
            .ok_or_else(|| EcomapError::Config(format!("{}: unrecognized period '{}'", field, text)))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawQuality {
    min_coverage: Option<f64>,
    expected_sectors: Option<Vec<String>>,
    expected_products: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawIndicators {
    seasonal_model: Option<SeasonalModel>,
    min_seasonal_periods: Option<usize>,
    top_n: Option<usize>,
    source_precedence: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    source_type: Option<String>,
    path: Option<PathBuf>,
    locale: Option<NumericLocale>,
    encodings: Option<Vec<String>>,
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOutput {
    directory: Option<PathBuf>,
    log_directory: Option<PathBuf>,
}

impl PipelineConfig {
    /// Resolve the config path from an explicit argument, `ECOMAP_CONFIG`, or the default.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load and validate a TOML file. Relative paths inside the file resolve against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EcomapError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base_dir)
    }

    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        Self::validate(raw, base_dir)
    }

    fn validate(raw: RawConfig, base_dir: &Path) -> Result<Self> {
        let geography = Self::validate_geography(raw.geography)?;
        let temporal = Self::validate_temporal(raw.temporal)?;
        raw.thresholds.validate()?;
        let quality = Self::validate_quality(raw.quality)?;
        let indicators = Self::validate_indicators(raw.indicators)?;

        let sources = raw
            .sources
            .into_iter()
            .enumerate()
            .map(|(idx, source)| Self::validate_source(idx, source, base_dir))
            .collect::<Result<Vec<_>>>()?;
        if sources.is_empty() {
            return Err(EcomapError::MissingField("sources".into()));
        }

        let output = OutputConfig {
            directory: resolve(base_dir, raw.output.directory.unwrap_or_else(|| PathBuf::from("output"))),
            log_directory: resolve(base_dir, raw.output.log_directory.unwrap_or_else(|| PathBuf::from("logs"))),
        };

        Ok(Self {
            geography,
            temporal,
            thresholds: raw.thresholds,
            quality,
            indicators,
            sources,
            output,
        })
    }

    fn validate_geography(raw: Option<RawGeography>) -> Result<GeographyConfig> {
        let raw = raw.ok_or_else(|| EcomapError::MissingField("geography".into()))?;
        let regions = raw
            .target_regions
            .ok_or_else(|| EcomapError::MissingField("geography.target_regions".into()))?;

        let mut normalizer = RegionNormalizer::new(&raw.aliases);
        let target_regions: BTreeSet<String> = regions.iter().filter_map(|r| normalizer.normalize(r)).collect();
        if target_regions.is_empty() {
            return Err(EcomapError::Config("geography.target_regions must list at least one region".into()));
        }
        let national_reference = raw.national_reference.as_deref().and_then(|r| normalizer.normalize(r));
        for region in target_regions.iter().chain(national_reference.iter()) {
            normalizer.register(region);
        }

        Ok(GeographyConfig {
            target_regions,
            national_reference,
            normalizer,
        })
    }

    fn validate_temporal(raw: Option<RawTemporal>) -> Result<TemporalConfig> {
        let raw = raw.ok_or_else(|| EcomapError::MissingField("temporal".into()))?;
        let start = raw
            .start
            .ok_or_else(|| EcomapError::MissingField("temporal.start".into()))?
            .resolve("temporal.start")?;
        let end = raw
            .end
            .ok_or_else(|| EcomapError::MissingField("temporal.end".into()))?
            .resolve("temporal.end")?;
        if start.first_month_index() > end.last_month_index() {
            return Err(EcomapError::Config(format!(
                "temporal.start ({}) is after temporal.end ({})",
                start, end
            )));
        }
        let default_period = raw
            .default_period
            .map(|p| p.resolve("temporal.default_period"))
            .transpose()?;

        Ok(TemporalConfig {
            start,
            end,
            default_period,
        })
    }

    fn validate_quality(raw: RawQuality) -> Result<QualityConfig> {
        let min_coverage = raw.min_coverage.unwrap_or(DEFAULT_MIN_COVERAGE);
        if !(0.0..=1.0).contains(&min_coverage) {
            return Err(EcomapError::Config(format!(
                "quality.min_coverage must be within [0, 1], got {}",
                min_coverage
            )));
        }
        let codes = |list: Option<Vec<String>>| {
            list.map(|items| {
                items
                    .iter()
                    .map(|c| c.trim().to_uppercase())
                    .filter(|c| !c.is_empty() && c != AGGREGATE_CODE)
                    .collect::<BTreeSet<_>>()
            })
        };

        Ok(QualityConfig {
            min_coverage,
            expected_sectors: codes(raw.expected_sectors),
            expected_products: codes(raw.expected_products),
        })
    }

    fn validate_indicators(raw: RawIndicators) -> Result<IndicatorConfig> {
        let min_seasonal_periods = raw.min_seasonal_periods.unwrap_or(MIN_SEASONAL_PERIODS);
        if min_seasonal_periods < MIN_SEASONAL_PERIODS {
            return Err(EcomapError::Config(format!(
                "indicators.min_seasonal_periods must be at least {}",
                MIN_SEASONAL_PERIODS
            )));
        }

        let mut source_precedence = Vec::new();
        for tag in raw.source_precedence.unwrap_or_default() {
            let source_type: SourceType = tag
                .parse()
                .map_err(|e| EcomapError::Config(format!("indicators.source_precedence: {}", e)))?;
            if !source_precedence.contains(&source_type) {
                source_precedence.push(source_type);
            }
        }
        for source_type in DEFAULT_SOURCE_PRECEDENCE {
            if !source_precedence.contains(&source_type) {
                source_precedence.push(source_type);
            }
        }

        Ok(IndicatorConfig {
            seasonal_model: raw.seasonal_model.unwrap_or_default(),
            min_seasonal_periods,
            top_n: raw.top_n.unwrap_or(DEFAULT_TOP_N),
            source_precedence,
        })
    }

    fn validate_source(idx: usize, raw: RawSource, base_dir: &Path) -> Result<SourceEntry> {
        let tag = raw
            .source_type
            .ok_or_else(|| EcomapError::MissingField(format!("sources[{}].source_type", idx)))?;
        let source_type: SourceType = tag
            .parse()
            .map_err(|e| EcomapError::Config(format!("sources[{}].source_type: {}", idx, e)))?;
        let path = raw
            .path
            .ok_or_else(|| EcomapError::MissingField(format!("sources[{}].path", idx)))?;

        let encodings = match raw.encodings {
            Some(labels) => labels
                .iter()
                .map(|label| {
                    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                        EcomapError::Config(format!("sources[{}].encodings: unknown encoding '{}'", idx, label))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => vec![encoding_rs::UTF_8, encoding_rs::WINDOWS_1252],
        };

        let extensions = raw
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        Ok(SourceEntry {
            source_type,
            path: resolve(base_dir, path),
            locale: raw.locale.unwrap_or_else(|| NumericLocale::default_for(source_type)),
            encodings,
            extensions,
        })
    }
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[geography]
target_regions = ["joinvile", "Florianópolis"]
national_reference = "SC"

[temporal]
start = 2020
end = "2023-12"

[[sources]]
source_type = "rais"
path = "data/rais"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = PipelineConfig::from_toml_str(MINIMAL, Path::new("/srv/ecomap")).unwrap();
        let allowed = config.geography.allowed_regions();
        assert!(allowed.contains("Joinville"));
        assert!(allowed.contains("Santa Catarina"));
        assert!(!allowed.contains("Blumenau"));
        assert_eq!(config.temporal.start, Period::year(2020));
        assert_eq!(config.quality.min_coverage, 0.8);
        assert_eq!(config.indicators.top_n, 10);
        assert_eq!(config.indicators.seasonal_model, SeasonalModel::Additive);
        assert_eq!(config.sources[0].source_type, SourceType::EmploymentStock);
        assert_eq!(config.sources[0].locale, NumericLocale::PtBr);
        assert_eq!(config.sources[0].path, PathBuf::from("/srv/ecomap/data/rais"));
        assert_eq!(config.sources[0].encodings.len(), 2);
        assert_eq!(config.output.directory, PathBuf::from("/srv/ecomap/output"));
    }

    #[test]
    fn unaccented_rows_match_accented_targets() {
        let text = MINIMAL.replace("\"Florianópolis\"", "\"São Bento do Sul\"");
        let config = PipelineConfig::from_toml_str(&text, Path::new(".")).unwrap();
        let geography = &config.geography;
        let region = geography.normalizer.normalize("SAO BENTO DO SUL").unwrap();
        assert!(geography.allowed_regions().contains(&region));
    }

    #[test]
    fn missing_required_fields_are_named() {
        let err = PipelineConfig::from_toml_str("[geography]\ntarget_regions = [\"Joinville\"]\n", Path::new("."))
            .unwrap_err();
        assert!(matches!(err, EcomapError::MissingField(ref f) if f == "temporal"));

        let no_start = MINIMAL.replace("start = 2020\n", "");
        let err = PipelineConfig::from_toml_str(&no_start, Path::new(".")).unwrap_err();
        assert!(matches!(err, EcomapError::MissingField(ref f) if f == "temporal.start"));

        let no_path = MINIMAL.replace("path = \"data/rais\"\n", "");
        let err = PipelineConfig::from_toml_str(&no_path, Path::new(".")).unwrap_err();
        assert!(matches!(err, EcomapError::MissingField(ref f) if f == "sources[0].path"));
    }

    #[test]
    fn precedence_is_completed_with_defaults() {
        let text = format!("{}\n[indicators]\nsource_precedence = [\"gdp\"]\n", MINIMAL);
        let config = PipelineConfig::from_toml_str(&text, Path::new(".")).unwrap();
        assert_eq!(config.indicators.precedence_rank(SourceType::Gdp), 0);
        assert_eq!(config.indicators.precedence_rank(SourceType::EmploymentStock), 1);
        assert_eq!(config.indicators.source_precedence.len(), 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let text = format!("{}\n[quality]\nmin_coverage = 1.5\n", MINIMAL);
        assert!(matches!(
            PipelineConfig::from_toml_str(&text, Path::new(".")),
            Err(EcomapError::Config(_))
        ));

        let text = MINIMAL.replace("path = \"data/rais\"", "path = \"data/rais\"\nencodings = [\"klingon\"]");
        assert!(matches!(
            PipelineConfig::from_toml_str(&text, Path::new(".")),
            Err(EcomapError::Config(_))
        ));
    }
}
