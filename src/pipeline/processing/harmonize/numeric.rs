use serde::{Deserialize, Serialize};

use crate::domain::SourceType;

/// Number formatting convention of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericLocale {
    /// `1.234,56`
    #[serde(rename = "pt-BR", alias = "pt_BR", alias = "pt-br")]
    PtBr,
    /// `1,234.56`
    #[serde(rename = "en-US", alias = "en_US", alias = "en-us")]
    EnUs,
}

impl NumericLocale {
    /// Government microdata is published with Brazilian formatting; aggregator
    /// exports use US formatting.
    pub fn default_for(source_type: SourceType) -> Self {
        match source_type {
            SourceType::SectorActivity => NumericLocale::EnUs,
            _ => NumericLocale::PtBr,
        }
    }

    fn separators(&self) -> (char, char) {
        match self {
            NumericLocale::PtBr => ('.', ','),
            NumericLocale::EnUs => (',', '.'),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericLocale::PtBr => "pt-BR",
            NumericLocale::EnUs => "en-US",
        }
    }
}

/// Outcome of coercing a single raw cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    Value(f64),
    Empty,
    Malformed,
}

const CURRENCY_MARKERS: &[&str] = &["R$", "US$", "$"];
const MISSING_MARKERS: &[&str] = &["-", "--", "...", "na", "n/a", "nan", "null", "x"];

/// Coerce a raw cell using the given locale.
///
/// Currency markers and whitespace are stripped; thousands separators must form
/// proper groups of three, otherwise the cell is malformed.
pub fn parse_number(raw: &str, locale: NumericLocale) -> NumericCell {
    let mut text: String = raw.trim().to_string();
    for marker in CURRENCY_MARKERS {
        text = text.replace(marker, "");
    }
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if text.is_empty() || MISSING_MARKERS.contains(&text.to_ascii_lowercase().as_str()) {
        return NumericCell::Empty;
    }

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(&text)),
    };

    let (thousands, decimal) = locale.separators();
    let mut parts = body.split(decimal);
    let integer_part = parts.next().unwrap_or("");
    let fraction_part = parts.next();
    if parts.next().is_some() {
        return NumericCell::Malformed;
    }

    let integer_digits = match ungroup(integer_part, thousands) {
        Some(digits) => digits,
        None => return NumericCell::Malformed,
    };

    let fraction_digits = match fraction_part {
        Some(f) if !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()) => f,
        Some(_) => return NumericCell::Malformed,
        None => "",
    };

    if integer_digits.is_empty() && fraction_digits.is_empty() {
        return NumericCell::Malformed;
    }

    let canonical = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if integer_digits.is_empty() { "0" } else { &integer_digits },
        if fraction_digits.is_empty() { "0" } else { fraction_digits }
    );

    match canonical.parse::<f64>() {
        Ok(v) if v.is_finite() => NumericCell::Value(v),
        _ => NumericCell::Malformed,
    }
}

/// Strip valid thousands grouping; `None` when the grouping is irregular or a
/// non-digit appears.
fn ungroup(integer_part: &str, thousands: char) -> Option<String> {
    if !integer_part.contains(thousands) {
        return integer_part
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| integer_part.to_string());
    }

    let groups: Vec<&str> = integer_part.split(thousands).collect();
    let first = groups.first()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    if groups[1..].iter().any(|g| g.len() != 3) {
        return None;
    }
    if !groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    Some(groups.concat())
}
