//! Validation registry
//!
//! Built once at startup and passed to the pipeline by reference.

use std::sync::Arc;

use crate::alignment::LocalAligner;
use crate::core::errors::{Result, ValidatorError};

use super::barcode_compare::BarcodeComparisonValidation;
use super::options::ValidationOptions;
use super::sliding_window::SlidingWindowQualityValidation;
use super::stop_codon::StopCodonValidation;
use super::Validation;

#[derive(Debug, Clone, Default)]
pub struct ValidationRegistry {
    validations: Vec<Validation>,
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in validation
    pub fn with_defaults(aligner: Arc<dyn LocalAligner>) -> Self {
        Self {
            validations: vec![
                Validation::SingleSequence(Arc::new(SlidingWindowQualityValidation)),
                Validation::SequenceCompare(Arc::new(BarcodeComparisonValidation::new(aligner))),
                Validation::SingleSequence(Arc::new(StopCodonValidation)),
            ],
        }
    }

    /// Add a validation; identifiers must be unique
    pub fn register(&mut self, validation: Validation) -> Result<()> {
        let identifier = validation.identifier();
        if self.get(identifier).is_some() {
            return Err(ValidatorError::invalid_parameter(
                "validation",
                identifier,
                "identifier already registered",
            ));
        }
        self.validations.push(validation);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&Validation> {
        self.validations
            .iter()
            .find(|validation| validation.identifier() == identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validation> {
        self.validations.iter()
    }

    pub fn identifiers(&self) -> Vec<&'static str> {
        self.validations.iter().map(Validation::identifier).collect()
    }

    pub fn len(&self) -> usize {
        self.validations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validations.is_empty()
    }

    /// Default options for every registered validation
    pub fn default_options(&self) -> Vec<ValidationOptions> {
        self.validations.iter().map(Validation::default_options).collect()
    }
}
