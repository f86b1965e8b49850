//! Validation framework
//!
//! A validation either inspects one sequence on its own or compares a candidate against
//! a reference (the user supplied barcode). Both kinds produce a [`ResultFact`] and are
//! looked up through an explicit [`ValidationRegistry`].

use std::sync::Arc;

use crate::core::data_structures::Sequence;
use crate::core::errors::Result;

pub mod barcode_compare;
pub mod options;
pub mod registry;
pub mod result;
pub mod sliding_window;
pub mod stop_codon;

pub use barcode_compare::BarcodeComparisonValidation;
pub use options::{
    BarcodeComparisonParams, SlidingWindowParams, StopCodonParams, ValidationOptions,
    ValidationParams,
};
pub use registry::ValidationRegistry;
pub use result::{
    ColumnValue, ResultColumn, ResultFact, ValidationEntry, ValidationRun, ValidationStage,
};
pub use sliding_window::{SlidingWindowQualityValidation, SlidingWindowReport};
pub use stop_codon::StopCodonValidation;

/// Validation applied to each sequence independently
pub trait SingleSequenceValidation: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn default_options(&self) -> ValidationOptions;

    fn validate(&self, sequence: &Sequence, options: &ValidationOptions) -> Result<ResultFact>;

    /// Attach findings to the sequence as annotations
    fn annotate(&self, _sequence: &mut Sequence, _options: &ValidationOptions) -> Result<()> {
        Ok(())
    }

    /// Validate and annotate in one pass; override when both derive from the same work
    fn validate_and_annotate(
        &self,
        sequence: &mut Sequence,
        options: &ValidationOptions,
    ) -> Result<ResultFact> {
        let fact = self.validate(sequence, options)?;
        self.annotate(sequence, options)?;
        Ok(fact)
    }
}

/// Validation comparing a candidate sequence against a reference
pub trait SequenceCompareValidation: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn default_options(&self) -> ValidationOptions;

    fn validate(
        &self,
        candidate: &Sequence,
        reference: &Sequence,
        options: &ValidationOptions,
    ) -> Result<ResultFact>;
}

/// A registered validation of either kind
#[derive(Clone)]
pub enum Validation {
    SingleSequence(Arc<dyn SingleSequenceValidation>),
    SequenceCompare(Arc<dyn SequenceCompareValidation>),
}

impl Validation {
    pub fn identifier(&self) -> &'static str {
        match self {
            Validation::SingleSequence(v) => v.identifier(),
            Validation::SequenceCompare(v) => v.identifier(),
        }
    }

    pub fn default_options(&self) -> ValidationOptions {
        match self {
            Validation::SingleSequence(v) => v.default_options(),
            Validation::SequenceCompare(v) => v.default_options(),
        }
    }
}

impl std::fmt::Debug for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Validation::SingleSequence(_) => "SingleSequence",
            Validation::SequenceCompare(_) => "SequenceCompare",
        };
        write!(f, "{kind}({})", self.identifier())
    }
}
