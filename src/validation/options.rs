//! Validation options
//!
//! One options bag per validation, matched to the validation by `identifier`.

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ValidatorError};

pub const SLIDING_WINDOW_QUALITY: &str = "slidingWindowQuality";
pub const BARCODE_COMPARISON: &str = "barcodeComparison";
pub const STOP_CODON: &str = "stopCodon";

/// Sliding window quality thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidingWindowParams {
    /// Window length in bases
    pub window_size: usize,
    /// Distance between window starts
    pub step_size: usize,
    /// Minimum confidence for a base to count as satisfied
    pub min_quality: i32,
    /// Percentage of satisfied bases a window needs to pass
    pub min_ratio_satisfied: f64,
}

impl Default for SlidingWindowParams {
    fn default() -> Self {
        Self {
            window_size: 300,
            step_size: 1,
            min_quality: 40,
            min_ratio_satisfied: 80.0,
        }
    }
}

impl SlidingWindowParams {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ValidatorError::invalid_parameter(
                "window_size",
                self.window_size,
                "must be at least 1",
            ));
        }
        if self.step_size == 0 {
            return Err(ValidatorError::invalid_parameter(
                "step_size",
                self.step_size,
                "must be at least 1",
            ));
        }
        if self.step_size > self.window_size {
            return Err(ValidatorError::invalid_parameter(
                "step_size",
                self.step_size,
                format!("must not exceed window size {}", self.window_size),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_ratio_satisfied) {
            return Err(ValidatorError::invalid_parameter(
                "min_ratio_satisfied",
                self.min_ratio_satisfied,
                "must be a percentage in [0, 100]",
            ));
        }
        Ok(())
    }
}

/// Barcode comparison thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeComparisonParams {
    pub min_identity_percent: f64,
    pub allow_reverse_complement: bool,
}

impl Default for BarcodeComparisonParams {
    fn default() -> Self {
        Self {
            min_identity_percent: 95.0,
            allow_reverse_complement: true,
        }
    }
}

/// Stop codon check settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopCodonParams {
    /// 1-based forward frame; `None` accepts any of the three
    pub reading_frame: Option<u8>,
}

/// Typed parameters, one variant per built-in validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationParams {
    SlidingWindowQuality(SlidingWindowParams),
    BarcodeComparison(BarcodeComparisonParams),
    StopCodon(StopCodonParams),
}

impl ValidationParams {
    /// Identifier of the validation these parameters belong to
    pub fn identifier(&self) -> &'static str {
        match self {
            ValidationParams::SlidingWindowQuality(_) => SLIDING_WINDOW_QUALITY,
            ValidationParams::BarcodeComparison(_) => BARCODE_COMPARISON,
            ValidationParams::StopCodon(_) => STOP_CODON,
        }
    }

    /// Range checks that do not depend on a sequence
    pub fn validate(&self) -> Result<()> {
        match self {
            ValidationParams::SlidingWindowQuality(params) => params.validate(),
            ValidationParams::BarcodeComparison(params) => {
                if !(0.0..=100.0).contains(&params.min_identity_percent) {
                    return Err(ValidatorError::invalid_parameter(
                        "min_identity_percent",
                        params.min_identity_percent,
                        "must be in [0, 100]",
                    ));
                }
                Ok(())
            }
            ValidationParams::StopCodon(params) => match params.reading_frame {
                Some(frame) if !(1..=3).contains(&frame) => Err(ValidatorError::invalid_parameter(
                    "reading_frame",
                    frame,
                    "must be 1, 2 or 3",
                )),
                _ => Ok(()),
            },
        }
    }
}

/// Named configuration for one validation task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOptions {
    pub identifier: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub params: ValidationParams,
}

impl ValidationOptions {
    pub fn new(
        identifier: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        params: ValidationParams,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
            description: description.into(),
            params,
        }
    }

    /// Fail unless these options were made for `identifier`
    pub fn ensure_identifier(&self, identifier: &str) -> Result<()> {
        if self.identifier != identifier {
            return Err(ValidatorError::ConfigurationMismatch {
                expected: identifier.to_string(),
                found: self.identifier.clone(),
            });
        }
        if self.params.identifier() != identifier {
            return Err(ValidatorError::ConfigurationMismatch {
                expected: identifier.to_string(),
                found: self.params.identifier().to_string(),
            });
        }
        Ok(())
    }

    pub fn sliding_window(&self) -> Result<&SlidingWindowParams> {
        self.ensure_identifier(SLIDING_WINDOW_QUALITY)?;
        match &self.params {
            ValidationParams::SlidingWindowQuality(params) => Ok(params),
            _ => Err(self.mismatch(SLIDING_WINDOW_QUALITY)),
        }
    }

    pub fn barcode_comparison(&self) -> Result<&BarcodeComparisonParams> {
        self.ensure_identifier(BARCODE_COMPARISON)?;
        match &self.params {
            ValidationParams::BarcodeComparison(params) => Ok(params),
            _ => Err(self.mismatch(BARCODE_COMPARISON)),
        }
    }

    pub fn stop_codon(&self) -> Result<&StopCodonParams> {
        self.ensure_identifier(STOP_CODON)?;
        match &self.params {
            ValidationParams::StopCodon(params) => Ok(params),
            _ => Err(self.mismatch(STOP_CODON)),
        }
    }

    fn mismatch(&self, expected: &str) -> ValidatorError {
        ValidatorError::ConfigurationMismatch {
            expected: expected.to_string(),
            found: self.params.identifier().to_string(),
        }
    }
}
