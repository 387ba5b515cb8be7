use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability percent at which risk stops being low
pub const MODERATE_THRESHOLD_PCT: f64 = 30.0;

/// Probability percent at which risk becomes high
pub const HIGH_THRESHOLD_PCT: f64 = 60.0;

/// Discrete injury risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    /// Band a probability expressed in percent.
    ///
    /// `< 30` Low, `30 <= p < 60` Moderate, `>= 60` High. Boundary values
    /// belong to the upper band.
    pub fn from_percent(probability_pct: f64) -> Self {
        if probability_pct < MODERATE_THRESHOLD_PCT {
            RiskBand::Low
        } else if probability_pct < HIGH_THRESHOLD_PCT {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }

    /// Band a probability in [0, 1]
    pub fn from_probability(probability: f64) -> Self {
        Self::from_percent(probability * 100.0)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Low => "LOW RISK",
            RiskBand::Moderate => "MODERATE RISK",
            RiskBand::High => "HIGH RISK",
        }
    }

    /// Guidance shown next to the band
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskBand::Low => "Continue current training plan",
            RiskBand::Moderate => "Monitor load and recovery closely",
            RiskBand::High => "Reduce load and consult the medical team",
        }
    }

    /// Label colored for the terminal (green, yellow, red)
    pub fn colored_label(&self) -> ColoredString {
        match self {
            RiskBand::Low => self.label().green().bold(),
            RiskBand::Moderate => self.label().yellow().bold(),
            RiskBand::High => self.label().red().bold(),
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RiskBand::from_percent(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_percent(29.999), RiskBand::Low);
        assert_eq!(RiskBand::from_percent(30.0), RiskBand::Moderate);
        assert_eq!(RiskBand::from_percent(59.999), RiskBand::Moderate);
        assert_eq!(RiskBand::from_percent(60.0), RiskBand::High);
        assert_eq!(RiskBand::from_percent(100.0), RiskBand::High);
    }

    #[test]
    fn test_band_from_probability() {
        assert_eq!(RiskBand::from_probability(0.25), RiskBand::Low);
        assert_eq!(RiskBand::from_probability(0.45), RiskBand::Moderate);
        assert_eq!(RiskBand::from_probability(0.75), RiskBand::High);
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(RiskBand::High.to_string(), "HIGH RISK");
        assert_eq!(
            serde_json::to_string(&RiskBand::Moderate).unwrap(),
            "\"moderate\""
        );
    }

    proptest! {
        #[test]
        fn test_band_partitions_percent_range(p in 0.0f64..=100.0) {
            let band = RiskBand::from_percent(p);
            prop_assert_eq!(band == RiskBand::Low, p < 30.0);
            prop_assert_eq!(band == RiskBand::Moderate, (30.0..60.0).contains(&p));
            prop_assert_eq!(band == RiskBand::High, p >= 60.0);
        }

        #[test]
        fn test_band_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let rank = |band: RiskBand| band as u8;
            prop_assert!(rank(RiskBand::from_percent(lo)) <= rank(RiskBand::from_percent(hi)));
        }
    }
}
