//! # Barcode Validator
//!
//! Trimming, assembly orchestration and quality validation for DNA barcode
//! sequencing runs. Raw Sanger traces are trimmed for primers and low quality ends,
//! assembled into contigs by an external assembler, turned into consensus sequences
//! and checked by a configurable set of validations.

pub mod alignment;
pub mod assembly;
pub mod core;
pub mod pipeline;
pub mod qc;
pub mod scoring;
pub mod utils;
pub mod validation;

// Re-export commonly used types at crate level
pub use crate::core::data_structures::{Annotation, Interval, Sequence, TrimEnds};
pub use crate::core::errors::ValidatorError;
pub use crate::core::trimmage::Trimmage;
pub use crate::pipeline::{BarcodeOutcome, CancellationToken, Pipeline, PipelineOptions};

/// Result type for application code
pub type Result<T> = anyhow::Result<T>;

/// Error type for application code
pub type Error = anyhow::Error;
