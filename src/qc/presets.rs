//! Trimming presets
//!
//! Named configurations for the trimming stage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error_probability::DEFAULT_ERROR_PROBABILITY_LIMIT;
use super::primer_trimmer::PrimerConfig;
use super::sequence_trimmer::{QualityTrimMethod, TrimmingOptions};

/// Folmer COI forward primer
pub const LCO1490: &str = "GGTCAACAAATCATAAAGATATTGG";
/// Folmer COI reverse primer
pub const HCO2198: &str = "TAAACTTCAGGGTGACCAAAAAATCA";

/// Trimming preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimmingPreset {
    /// Error limit 0.01, at most one primer mismatch
    Strict,
    /// Error limit 0.05, up to three primer mismatches - default
    Standard,
    /// Error limit 0.1, up to five primer mismatches
    Lenient,
    /// No trimming
    None,
}

impl From<TrimmingPreset> for QualityTrimMethod {
    fn from(preset: TrimmingPreset) -> Self {
        let error_probability_limit = match preset {
            TrimmingPreset::Strict => 0.01,
            TrimmingPreset::Standard | TrimmingPreset::None => DEFAULT_ERROR_PROBABILITY_LIMIT,
            TrimmingPreset::Lenient => 0.1,
        };
        QualityTrimMethod::ErrorProbability {
            error_probability_limit,
        }
    }
}

impl From<TrimmingPreset> for PrimerConfig {
    fn from(preset: TrimmingPreset) -> Self {
        let primers = vec![LCO1490.to_string(), HCO2198.to_string()];
        match preset {
            TrimmingPreset::Strict => Self {
                primers,
                max_mismatches: 1,
                min_match_length: 15,
                ..Default::default()
            },
            TrimmingPreset::Standard => Self {
                primers,
                ..Default::default()
            },
            TrimmingPreset::Lenient => Self {
                primers,
                max_mismatches: 5,
                min_match_length: 8,
                ..Default::default()
            },
            TrimmingPreset::None => Self::default(),
        }
    }
}

impl From<TrimmingPreset> for TrimmingOptions {
    fn from(preset: TrimmingPreset) -> Self {
        let enabled = preset != TrimmingPreset::None;

        Self {
            enable_quality_trimming: enabled,
            enable_primer_trimming: enabled,
            quality_method: preset.into(),
            primer: preset.into(),
            ..Default::default()
        }
    }
}

impl FromStr for TrimmingPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(TrimmingPreset::Strict),
            "standard" => Ok(TrimmingPreset::Standard),
            "lenient" => Ok(TrimmingPreset::Lenient),
            "none" => Ok(TrimmingPreset::None),
            other => Err(format!("unknown trimming preset '{other}'")),
        }
    }
}

impl fmt::Display for TrimmingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimmingPreset::Strict => write!(f, "Strict (p<=0.01, 1 primer mismatch)"),
            TrimmingPreset::Standard => write!(f, "Standard (p<=0.05, 3 primer mismatches)"),
            TrimmingPreset::Lenient => write!(f, "Lenient (p<=0.1, 5 primer mismatches)"),
            TrimmingPreset::None => write!(f, "Disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_method_conversion() {
        let method: QualityTrimMethod = TrimmingPreset::Strict.into();
        assert_eq!(
            method,
            QualityTrimMethod::ErrorProbability {
                error_probability_limit: 0.01
            }
        );
    }

    #[test]
    fn test_primer_conversion() {
        let config: PrimerConfig = TrimmingPreset::Strict.into();
        assert_eq!(config.max_mismatches, 1);
        assert_eq!(config.primers, vec![LCO1490, HCO2198]);

        let config: PrimerConfig = TrimmingPreset::None.into();
        assert!(config.primers.is_empty());
    }

    #[test]
    fn test_options_conversion() {
        let options: TrimmingOptions = TrimmingPreset::Standard.into();
        assert!(options.enable_quality_trimming);
        assert!(options.enable_primer_trimming);

        let options: TrimmingOptions = TrimmingPreset::None.into();
        assert!(!options.enable_quality_trimming);
        assert!(!options.enable_primer_trimming);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Lenient".parse::<TrimmingPreset>(), Ok(TrimmingPreset::Lenient));
        assert!("loose".parse::<TrimmingPreset>().is_err());
        assert_eq!(TrimmingPreset::None.to_string(), "Disabled");
    }
}
