//! Trace trimming stage
//!
//! Removes primers from the raw trace, then trims low quality ends from what is left.
//! Both Trimmages are expressed on the original trace and add up.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::criteria::{AmbiguityCriterion, QualityCriterion};
use super::criteria_trimmer::BaseCriteriaTrimmer;
use super::error_probability::{ErrorProbabilityTrimmer, DEFAULT_ERROR_PROBABILITY_LIMIT};
use super::primer_trimmer::{PrimerConfig, PrimerTrimmer};
use super::qc_stats::TrimmingStats;
use crate::alignment::LocalAligner;
use crate::core::data_structures::{Sequence, TrimEnds};
use crate::core::errors::{Result, ValidatorError};
use crate::core::trimmage::Trimmage;

/// How low quality ends are detected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum QualityTrimMethod {
    /// Modified Mott trimming against an error probability limit
    ErrorProbability { error_probability_limit: f64 },
    /// Quality and ambiguity criteria with failure budgets
    Criteria {
        min_quality: i32,
        max_low_quality_bases: usize,
        max_ambiguities: usize,
    },
}

impl Default for QualityTrimMethod {
    fn default() -> Self {
        QualityTrimMethod::ErrorProbability {
            error_probability_limit: DEFAULT_ERROR_PROBABILITY_LIMIT,
        }
    }
}

/// Trimming stage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimmingOptions {
    pub enable_quality_trimming: bool,
    pub enable_primer_trimming: bool,
    pub ends: TrimEnds,
    pub quality_method: QualityTrimMethod,
    pub primer: PrimerConfig,
}

impl Default for TrimmingOptions {
    fn default() -> Self {
        Self {
            enable_quality_trimming: true,
            enable_primer_trimming: true,
            ends: TrimEnds::Both,
            quality_method: QualityTrimMethod::default(),
            primer: PrimerConfig::default(),
        }
    }
}

impl TrimmingOptions {
    pub fn validate(&self) -> Result<()> {
        match self.quality_method {
            QualityTrimMethod::ErrorProbability {
                error_probability_limit,
            } => {
                if !(error_probability_limit > 0.0 && error_probability_limit <= 1.0) {
                    return Err(ValidatorError::invalid_parameter(
                        "error_probability_limit",
                        error_probability_limit,
                        "must be in (0, 1]",
                    ));
                }
            }
            QualityTrimMethod::Criteria { min_quality, .. } => {
                if min_quality < 0 {
                    return Err(ValidatorError::invalid_parameter(
                        "min_quality",
                        min_quality,
                        "must not be negative",
                    ));
                }
            }
        }
        self.primer.alignment.validate()
    }
}

enum QualityTrimmer {
    ErrorProbability(ErrorProbabilityTrimmer),
    Criteria(BaseCriteriaTrimmer),
}

impl QualityTrimmer {
    fn from_method(method: &QualityTrimMethod) -> Self {
        match *method {
            QualityTrimMethod::ErrorProbability {
                error_probability_limit,
            } => QualityTrimmer::ErrorProbability(ErrorProbabilityTrimmer::new(
                error_probability_limit,
            )),
            QualityTrimMethod::Criteria {
                min_quality,
                max_low_quality_bases,
                max_ambiguities,
            } => QualityTrimmer::Criteria(
                BaseCriteriaTrimmer::default()
                    .with_criterion(QualityCriterion::new(min_quality, max_low_quality_bases))
                    .with_criterion(AmbiguityCriterion::new(max_ambiguities)),
            ),
        }
    }

    fn trim(&self, sequence: &Sequence, ends: TrimEnds) -> Trimmage {
        match self {
            QualityTrimmer::ErrorProbability(trimmer) => trimmer.trim(sequence, ends),
            QualityTrimmer::Criteria(trimmer) => trimmer.trim(sequence, ends),
        }
    }
}

/// Result of trimming one trace
#[derive(Debug, Clone, PartialEq)]
pub struct TrimOutcome {
    /// The trace with every trimmed base removed
    pub sequence: Sequence,
    /// Total trim on the original trace
    pub trimmage: Trimmage,
    pub primer_trimmage: Trimmage,
    pub quality_trimmage: Trimmage,
    /// Primers found in the trace
    pub primer_hits: Vec<String>,
    /// Quality trimming was enabled but the trace has no quality track
    pub quality_skipped: bool,
}

impl TrimOutcome {
    pub fn is_emptied(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Primer then quality trimming for traces and consensus sequences
pub struct SequenceTrimmer {
    options: TrimmingOptions,
    quality: QualityTrimmer,
    primers: PrimerTrimmer,
}

impl SequenceTrimmer {
    pub fn new(options: TrimmingOptions, aligner: Arc<dyn LocalAligner>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            quality: QualityTrimmer::from_method(&options.quality_method),
            primers: PrimerTrimmer::new(options.primer.clone(), aligner),
            options,
        })
    }

    pub fn options(&self) -> &TrimmingOptions {
        &self.options
    }

    pub fn trim(&self, sequence: &Sequence) -> Result<TrimOutcome> {
        sequence.check()?;
        let length = sequence.len();

        let (primer_trimmage, primer_hits) = if self.options.enable_primer_trimming {
            let hits = self.primers.detect_primers(sequence)?;
            let trimmage = hits
                .iter()
                .fold(Trimmage::EMPTY, |acc, hit| acc.max(&hit.trimmage))
                .clamped_to(length);
            let mut names: Vec<String> = hits.into_iter().map(|hit| hit.primer).collect();
            names.dedup();
            (trimmage, names)
        } else {
            (Trimmage::EMPTY, Vec::new())
        };

        let primer_trimmed = sequence.trimmed(&primer_trimmage)?;

        let mut quality_skipped = false;
        let quality_trimmage = if !self.options.enable_quality_trimming || primer_trimmed.is_empty()
        {
            Trimmage::EMPTY
        } else if !primer_trimmed.has_quality() {
            warn!(
                "Trace '{}' has no quality track, skipping quality trimming",
                sequence.name
            );
            quality_skipped = true;
            Trimmage::EMPTY
        } else {
            self.quality.trim(&primer_trimmed, self.options.ends)
        };

        let trimmage = primer_trimmage.combine_sequential(&quality_trimmage);
        trimmage.validate_for(length)?;
        let trimmed = sequence.trimmed(&trimmage)?;

        debug!(
            "Trimmed '{}': primer {}, quality {}, {} of {} bases kept",
            sequence.name,
            primer_trimmage,
            quality_trimmage,
            trimmed.len(),
            length
        );

        Ok(TrimOutcome {
            sequence: trimmed,
            trimmage,
            primer_trimmage,
            quality_trimmage,
            primer_hits,
            quality_skipped,
        })
    }

    /// Trim traces in parallel; results keep the input order
    pub fn trim_all(&self, sequences: &[Sequence]) -> Vec<Result<TrimOutcome>> {
        sequences.par_iter().map(|s| self.trim(s)).collect()
    }

    /// Trim traces in parallel and summarise what was removed
    pub fn trim_all_with_stats(
        &self,
        sequences: &[Sequence],
    ) -> (Vec<Result<TrimOutcome>>, TrimmingStats) {
        let outcomes = self.trim_all(sequences);
        let stats = collect_stats(sequences, &outcomes);
        (outcomes, stats)
    }
}

/// Summarise trimming outcomes; `outcomes` follows the order of `sequences`
pub fn collect_stats(sequences: &[Sequence], outcomes: &[Result<TrimOutcome>]) -> TrimmingStats {
    let mut stats = TrimmingStats::new();

    for (sequence, outcome) in sequences.iter().zip(outcomes) {
        stats.record_input(sequence.len(), sequence.quality.as_deref());
        match outcome {
            Ok(outcome) => {
                stats.record_quality_trimming(outcome.quality_trimmage.total());
                if !outcome.primer_hits.is_empty() {
                    stats.record_primer_trimming(&outcome.primer_hits, outcome.primer_trimmage.total());
                }
                stats.record_trimmed(outcome.sequence.len(), outcome.sequence.quality.as_deref());
            }
            Err(_) => stats.record_failed(),
        }
    }
    stats.finalize();
    stats
}
