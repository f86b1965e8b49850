pub mod data_structures;
pub mod errors;
pub mod pipeline_types;
pub mod trimmage;

// Re-export the shared sequence model
pub use data_structures::{Annotation, Interval, Sequence, TrimEnds};
pub use errors::{Result, ValidatorError};
pub use pipeline_types::{
    BarcodeInput, ConsensusRecord, PipelineOutputBuilder, PipelineOutputRecord, RunStatus,
    TrimmedTrace,
};
pub use trimmage::Trimmage;
