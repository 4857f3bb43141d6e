use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::pipeline::utils::StringUtils;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(?:\.0+)?$").unwrap());
static YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})[-/.](\d{1,2})$").unwrap());
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})[-/.](\d{4})$").unwrap());
static COMPACT_YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})$").unwrap());
static NAMED_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());
static WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").unwrap());

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%Y%m%d"];

/// Portuguese month names and abbreviations, accent-folded.
const MONTH_NAMES: &[(&str, u32)] = &[
    ("janeiro", 1),
    ("jan", 1),
    ("fevereiro", 2),
    ("fev", 2),
    ("marco", 3),
    ("mar", 3),
    ("abril", 4),
    ("abr", 4),
    ("maio", 5),
    ("mai", 5),
    ("junho", 6),
    ("jun", 6),
    ("julho", 7),
    ("jul", 7),
    ("agosto", 8),
    ("ago", 8),
    ("setembro", 9),
    ("set", 9),
    ("outubro", 10),
    ("out", 10),
    ("novembro", 11),
    ("nov", 11),
    ("dezembro", 12),
    ("dez", 12),
];

/// A reporting period: a whole year or a single month of a year.
///
/// Ordering is chronological, and a year sorts before each of its months
/// (`2021 < 2021-01 < 2021-12 < 2022`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub month: Option<u32>,
}

impl Period {
    pub fn year(year: i32) -> Self {
        Self { year, month: None }
    }

    /// Monthly period; `None` when the month is outside 1..=12.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self {
            year,
            month: Some(month),
        })
    }

    pub fn from_year_month(year: i32, month: Option<u32>) -> Option<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return None;
        }
        match month {
            Some(m) => Self::month(year, m),
            None => Some(Self::year(year)),
        }
    }

    pub fn is_monthly(&self) -> bool {
        self.month.is_some()
    }

    /// Previous period at the same granularity.
    pub fn previous(&self) -> Self {
        match self.month {
            Some(1) => Self {
                year: self.year - 1,
                month: Some(12),
            },
            Some(m) => Self {
                year: self.year,
                month: Some(m - 1),
            },
            None => Self::year(self.year - 1),
        }
    }

    /// Next period at the same granularity.
    pub fn next(&self) -> Self {
        match self.month {
            Some(12) => Self {
                year: self.year + 1,
                month: Some(1),
            },
            Some(m) => Self {
                year: self.year,
                month: Some(m + 1),
            },
            None => Self::year(self.year + 1),
        }
    }

    /// Absolute index of the first month covered by this period.
    pub fn first_month_index(&self) -> i64 {
        self.year as i64 * 12 + self.month.map(|m| m as i64 - 1).unwrap_or(0)
    }

    /// Absolute index of the last month covered by this period.
    pub fn last_month_index(&self) -> i64 {
        self.year as i64 * 12 + self.month.map(|m| m as i64 - 1).unwrap_or(11)
    }

    /// True when every month of `self` lies within `[start, end]`.
    pub fn within(&self, start: &Period, end: &Period) -> bool {
        self.first_month_index() >= start.first_month_index()
            && self.last_month_index() <= end.last_month_index()
    }

    /// Parse a period from the textual forms found in source files.
    ///
    /// Accepts `YYYY`, `YYYY-MM`, `YYYY/MM`, `YYYYMM`, `MM/YYYY`, `MM-YYYY`, full dates
    /// (reduced to their month) and Portuguese month names such as `janeiro de 2023`
    /// or `jan/2023`.
    pub fn parse(raw: &str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(caps) = YEAR_ONLY.captures(text) {
            return Self::from_year_month(caps[1].parse().ok()?, None);
        }
        if let Some(caps) = YEAR_MONTH.captures(text) {
            return Self::from_year_month(caps[1].parse().ok()?, Some(caps[2].parse().ok()?));
        }
        if let Some(caps) = MONTH_YEAR.captures(text) {
            return Self::from_year_month(caps[2].parse().ok()?, Some(caps[1].parse().ok()?));
        }
        if let Some(caps) = COMPACT_YEAR_MONTH.captures(text) {
            return Self::from_year_month(caps[1].parse().ok()?, Some(caps[2].parse().ok()?));
        }

        // Full dates, optionally carrying a time component
        let date_part = text.split(['T', ' ']).next().unwrap_or(text);
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
                return Self::from_year_month(date.year(), Some(date.month()));
            }
        }

        Self::parse_month_name(text)
    }

    fn parse_month_name(text: &str) -> Option<Self> {
        let folded = StringUtils::fold_accents(text).to_lowercase();
        let year: i32 = NAMED_YEAR.captures(&folded)?[1].parse().ok()?;
        let month = WORDS.find_iter(&folded).find_map(|word| {
            MONTH_NAMES
                .iter()
                .find(|(name, _)| *name == word.as_str())
                .map(|(_, number)| *number)
        })?;
        Self::from_year_month(year, Some(month))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{:02}", self.year, m),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s).ok_or_else(|| format!("unrecognized period '{}'", s))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
