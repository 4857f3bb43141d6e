use serde::{Deserialize, Serialize};

use crate::error::{EcomapError, Result};

pub const HIGH_SPECIALIZATION: &str = "high specialization";
pub const AVERAGE: &str = "average";
pub const LOW_SPECIALIZATION: &str = "low specialization";

pub const STRONG_ADVANTAGE: &str = "strong advantage";
pub const MODERATE_ADVANTAGE: &str = "moderate advantage";
pub const NO_ADVANTAGE: &str = "no advantage";

pub const LOW_CONCENTRATION: &str = "low concentration";
pub const MODERATE_CONCENTRATION: &str = "moderate concentration";
pub const HIGH_CONCENTRATION: &str = "high concentration";

pub const EXPANSION: &str = "expansion";
pub const CONTRACTION: &str = "contraction";
pub const STABLE: &str = "stable";

pub const SEASONAL_PEAK: &str = "seasonal peak";
pub const SEASONAL_TROUGH: &str = "seasonal trough";
pub const NEUTRAL: &str = "neutral";

/// Cut-offs used to label indicator values. Boundary values fall into the middle band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    pub lq_high: f64,
    pub lq_low: f64,
    pub rca_strong: f64,
    pub rca_moderate: f64,
    pub hhi_moderate: f64,
    pub hhi_high: f64,
    /// Seasonal components within this distance of the neutral point are "neutral"
    /// (additive: absolute units; multiplicative: distance from 1.0)
    pub seasonal_neutral: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            lq_high: 1.2,
            lq_low: 0.8,
            rca_strong: 2.5,
            rca_moderate: 1.0,
            hhi_moderate: 0.15,
            hhi_high: 0.25,
            seasonal_neutral: 0.0,
        }
    }
}

impl BandThresholds {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.lq_high,
            self.lq_low,
            self.rca_strong,
            self.rca_moderate,
            self.hhi_moderate,
            self.hhi_high,
            self.seasonal_neutral,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(EcomapError::Config("thresholds must be finite numbers".into()));
        }
        if self.lq_low > self.lq_high {
            return Err(EcomapError::Config(format!(
                "thresholds.lq_low ({}) must not exceed thresholds.lq_high ({})",
                self.lq_low, self.lq_high
            )));
        }
        if self.rca_moderate > self.rca_strong {
            return Err(EcomapError::Config(format!(
                "thresholds.rca_moderate ({}) must not exceed thresholds.rca_strong ({})",
                self.rca_moderate, self.rca_strong
            )));
        }
        if self.hhi_moderate > self.hhi_high {
            return Err(EcomapError::Config(format!(
                "thresholds.hhi_moderate ({}) must not exceed thresholds.hhi_high ({})",
                self.hhi_moderate, self.hhi_high
            )));
        }
        if self.seasonal_neutral < 0.0 {
            return Err(EcomapError::Config("thresholds.seasonal_neutral must be >= 0".into()));
        }
        Ok(())
    }

    pub fn location_quotient(&self, value: f64) -> &'static str {
        if value > self.lq_high {
            HIGH_SPECIALIZATION
        } else if value < self.lq_low {
            LOW_SPECIALIZATION
        } else {
            AVERAGE
        }
    }

    pub fn comparative_advantage(&self, value: f64) -> &'static str {
        if value > self.rca_strong {
            STRONG_ADVANTAGE
        } else if value < self.rca_moderate {
            NO_ADVANTAGE
        } else {
            MODERATE_ADVANTAGE
        }
    }

    pub fn concentration(&self, value: f64) -> &'static str {
        if value > self.hhi_high {
            HIGH_CONCENTRATION
        } else if value < self.hhi_moderate {
            LOW_CONCENTRATION
        } else {
            MODERATE_CONCENTRATION
        }
    }

    pub fn growth(&self, value: f64) -> &'static str {
        if value > 0.0 {
            EXPANSION
        } else if value < 0.0 {
            CONTRACTION
        } else {
            STABLE
        }
    }

    /// `neutral_point` is 0 for additive components and 1 for multiplicative ones.
    pub fn seasonal(&self, component: f64, neutral_point: f64) -> &'static str {
        let deviation = component - neutral_point;
        if deviation > self.seasonal_neutral {
            SEASONAL_PEAK
        } else if deviation < -self.seasonal_neutral {
            SEASONAL_TROUGH
        } else {
            NEUTRAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bands_match_published_cutoffs() {
        let t = BandThresholds::default();
        assert_eq!(t.location_quotient(1.5), HIGH_SPECIALIZATION);
        assert_eq!(t.location_quotient(1.2), AVERAGE);
        assert_eq!(t.location_quotient(0.8), AVERAGE);
        assert_eq!(t.location_quotient(0.5), LOW_SPECIALIZATION);
        assert_eq!(t.comparative_advantage(3.0), STRONG_ADVANTAGE);
        assert_eq!(t.comparative_advantage(1.0), MODERATE_ADVANTAGE);
        assert_eq!(t.comparative_advantage(0.99), NO_ADVANTAGE);
        assert_eq!(t.concentration(0.38), HIGH_CONCENTRATION);
        assert_eq!(t.concentration(0.2), MODERATE_CONCENTRATION);
        assert_eq!(t.concentration(0.1), LOW_CONCENTRATION);
        assert_eq!(t.growth(0.0), STABLE);
        assert_eq!(t.growth(-0.1), CONTRACTION);
        assert_eq!(t.seasonal(1.1, 1.0), SEASONAL_PEAK);
        assert_eq!(t.seasonal(-3.0, 0.0), SEASONAL_TROUGH);
        assert_eq!(t.seasonal(0.0, 0.0), NEUTRAL);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let t = BandThresholds {
            lq_low: 1.5,
            ..BandThresholds::default()
        };
        assert!(t.validate().is_err());
        assert!(BandThresholds::default().validate().is_ok());
    }
}
