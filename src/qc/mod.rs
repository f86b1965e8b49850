//! Trace trimming
//!
//! Provides end trimming for Sanger traces and consensus sequences:
//! - Error probability trimming (modified Mott)
//! - Criteria trimming (quality and ambiguity budgets)
//! - Primer detection and removal
//! - Trimming statistics and presets

pub mod criteria;
pub mod criteria_trimmer;
pub mod error_probability;
pub mod presets;
pub mod primer_trimmer;
pub mod qc_stats;
pub mod sequence_trimmer;

pub use criteria::{AmbiguityCriterion, Criterion, FailureCounter, QualityCriterion};
pub use criteria_trimmer::BaseCriteriaTrimmer;
pub use error_probability::ErrorProbabilityTrimmer;
pub use presets::TrimmingPreset;
pub use primer_trimmer::{PrimerConfig, PrimerMatch, PrimerTrimmer};
pub use qc_stats::TrimmingStats;
pub use sequence_trimmer::{QualityTrimMethod, SequenceTrimmer, TrimOutcome, TrimmingOptions};
