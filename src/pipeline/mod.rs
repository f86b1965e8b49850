//! Barcode validation pipeline
//!
//! Orchestrates trimming, assembly, consensus building and validation for each
//! barcode, with hierarchical progress reporting and cooperative cancellation.

pub mod cancel;
pub mod orchestrator;
pub mod progress;

pub use cancel::CancellationToken;
pub use orchestrator::{BarcodeOutcome, Pipeline, PipelineOptions};
pub use progress::{CompositeProgress, NoProgress, PipelineStage, ProgressListener};
