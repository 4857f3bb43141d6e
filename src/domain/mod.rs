//! Canonical data model shared by every pipeline stage.

pub mod period;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants;
pub use period::Period;

/// Kind of government data source a file comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceType {
    /// Formal employment stock by municipality and sector (RAIS-like)
    EmploymentStock,
    /// Monthly hires minus separations (CAGED-like)
    EmploymentFlow,
    /// Municipal GDP, optionally broken down by sector
    Gdp,
    /// Exports by municipality and product (ComexStat-like)
    TradeExport,
    /// Employment by sector from activity aggregators (DataViva-like)
    SectorActivity,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::EmploymentStock,
        SourceType::EmploymentFlow,
        SourceType::Gdp,
        SourceType::TradeExport,
        SourceType::SectorActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::EmploymentStock => constants::EMPLOYMENT_STOCK,
            SourceType::EmploymentFlow => constants::EMPLOYMENT_FLOW,
            SourceType::Gdp => constants::GDP,
            SourceType::TradeExport => constants::TRADE_EXPORT,
            SourceType::SectorActivity => constants::SECTOR_ACTIVITY,
        }
    }

    /// Trade sources key their rows by product, every other source by sector.
    pub fn is_trade(&self) -> bool {
        matches!(self, SourceType::TradeExport)
    }

    /// Base metric the source's values measure.
    pub fn metric(&self) -> Metric {
        match self {
            SourceType::EmploymentStock | SourceType::SectorActivity => Metric::Employment,
            SourceType::EmploymentFlow => Metric::EmploymentFlow,
            SourceType::Gdp => Metric::Gdp,
            SourceType::TradeExport => Metric::Exports,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            SourceType::EmploymentStock | SourceType::SectorActivity => Unit::EmploymentCount,
            SourceType::EmploymentFlow => Unit::EmploymentChange,
            SourceType::Gdp => Unit::Monetary {
                currency: "BRL".to_string(),
            },
            SourceType::TradeExport => Unit::Monetary {
                currency: "USD".to_string(),
            },
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = constants::source_alias_to_type(s).ok_or_else(|| {
            format!(
                "unknown source type '{}' (expected one of: {})",
                s,
                constants::get_supported_source_types().join(", ")
            )
        })?;
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| format!("unknown source type '{}'", s))
    }
}

/// Measurement unit of a canonical value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Unit {
    EmploymentCount,
    EmploymentChange,
    Monetary { currency: String },
}

impl Unit {
    /// Negative values are implausible for counts and monetary totals.
    pub fn is_non_negative(&self) -> bool {
        !matches!(self, Unit::EmploymentChange)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::EmploymentCount => f.write_str("employment-count"),
            Unit::EmploymentChange => f.write_str("employment-change"),
            Unit::Monetary { currency } => write!(f, "monetary:{}", currency),
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employment-count" => Ok(Unit::EmploymentCount),
            "employment-change" => Ok(Unit::EmploymentChange),
            other => other
                .strip_prefix("monetary:")
                .map(|currency| Unit::Monetary {
                    currency: currency.to_string(),
                })
                .ok_or_else(|| format!("unknown unit '{}'", other)),
        }
    }
}

/// Economic activity a record refers to: an industry sector or a traded product, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "code", rename_all = "snake_case")]
pub enum ActivityCode {
    Sector(String),
    Product(String),
}

impl ActivityCode {
    pub fn code(&self) -> &str {
        match self {
            ActivityCode::Sector(code) | ActivityCode::Product(code) => code,
        }
    }

    pub fn sector_code(&self) -> Option<&str> {
        match self {
            ActivityCode::Sector(code) => Some(code),
            ActivityCode::Product(_) => None,
        }
    }

    pub fn product_code(&self) -> Option<&str> {
        match self {
            ActivityCode::Product(code) => Some(code),
            ActivityCode::Sector(_) => None,
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            ActivityCode::Sector(_) => Dimension::Sector,
            ActivityCode::Product(_) => Dimension::Product,
        }
    }

    /// Region-level rows carry the aggregate code instead of a category.
    pub fn is_aggregate(&self) -> bool {
        self.code() == constants::AGGREGATE_CODE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sector,
    Product,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Sector => f.write_str("sector"),
            Dimension::Product => f.write_str("product"),
        }
    }
}

/// A harmonized observation. Immutable once it leaves the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub region_code: String,
    pub period: Period,
    pub activity: ActivityCode,
    /// `None` when the raw cell was empty or malformed
    pub value: Option<f64>,
    pub unit: Unit,
    /// Identity of the source file the record came from
    pub source_id: String,
    pub source_type: SourceType,
}

impl CanonicalRecord {
    pub fn metric(&self) -> Metric {
        self.source_type.metric()
    }
}

/// Base quantity an indicator is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Employment,
    EmploymentFlow,
    Gdp,
    Exports,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Employment => "employment",
            Metric::EmploymentFlow => "employment_flow",
            Metric::Gdp => "gdp",
            Metric::Exports => "exports",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Metric::Employment, Metric::EmploymentFlow, Metric::Gdp, Metric::Exports]
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndicatorType {
    #[serde(rename = "LQ")]
    LocationQuotient,
    #[serde(rename = "RCA")]
    RevealedComparativeAdvantage,
    #[serde(rename = "HHI")]
    HerfindahlHirschman,
    #[serde(rename = "growth")]
    Growth,
    #[serde(rename = "seasonality")]
    Seasonality,
}

impl IndicatorType {
    pub const ALL: [IndicatorType; 5] = [
        IndicatorType::LocationQuotient,
        IndicatorType::RevealedComparativeAdvantage,
        IndicatorType::HerfindahlHirschman,
        IndicatorType::Growth,
        IndicatorType::Seasonality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::LocationQuotient => "LQ",
            IndicatorType::RevealedComparativeAdvantage => "RCA",
            IndicatorType::HerfindahlHirschman => "HHI",
            IndicatorType::Growth => "growth",
            IndicatorType::Seasonality => "seasonality",
        }
    }

    /// File stem for the per-indicator table.
    pub fn table_name(&self) -> &'static str {
        match self {
            IndicatorType::LocationQuotient => "lq",
            IndicatorType::RevealedComparativeAdvantage => "rca",
            IndicatorType::HerfindahlHirschman => "hhi",
            IndicatorType::Growth => "growth",
            IndicatorType::Seasonality => "seasonality",
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s) || t.table_name() == s)
            .ok_or_else(|| format!("unknown indicator type '{}'", s))
    }
}

/// One computed indicator value. `value == None` means "not computable", which is
/// distinct from a computed zero; the band is absent exactly when the value is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    pub indicator_type: IndicatorType,
    pub metric: Metric,
    pub region_code: String,
    pub sector_or_product_code: Option<String>,
    pub period: Period,
    pub value: Option<f64>,
    pub classification_band: Option<String>,
}

impl IndicatorRecord {
    pub fn is_computed(&self) -> bool {
        self.value.is_some()
    }
}
