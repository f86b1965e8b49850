//! Local pairwise alignment
//!
//! The trimming and comparison code only depends on the [`LocalAligner`] contract: two
//! aligned strings with `-` gap characters plus the offset of the aligned region in the
//! target. [`BioLocalAligner`] provides the default Smith-Waterman implementation.

use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ValidatorError};

pub const GAP: u8 = b'-';

/// Default primer gap penalties
pub const DEFAULT_GAP_OPEN_PENALTY: f64 = 12.0;
pub const DEFAULT_GAP_EXTEND_PENALTY: f64 = 3.0;

/// Nucleotide substitution scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    pub match_score: i32,
    pub mismatch_score: i32,
    /// Score when either base is an ambiguity code
    pub ambiguous_score: i32,
}

impl Default for ScoreMatrix {
    fn default() -> Self {
        Self {
            match_score: 5,
            mismatch_score: -4,
            ambiguous_score: -2,
        }
    }
}

impl ScoreMatrix {
    pub fn score(&self, a: u8, b: u8) -> i32 {
        let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
        let ambiguous = |x: u8| !matches!(x, b'A' | b'C' | b'G' | b'T');
        if ambiguous(a) || ambiguous(b) {
            self.ambiguous_score
        } else if a == b {
            self.match_score
        } else {
            self.mismatch_score
        }
    }
}

/// Gap penalties (positive numbers) and substitution scores for one alignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParameters {
    pub gap_open_penalty: f64,
    pub gap_extend_penalty: f64,
    pub scores: ScoreMatrix,
}

impl Default for AlignmentParameters {
    fn default() -> Self {
        Self {
            gap_open_penalty: DEFAULT_GAP_OPEN_PENALTY,
            gap_extend_penalty: DEFAULT_GAP_EXTEND_PENALTY,
            scores: ScoreMatrix::default(),
        }
    }
}

impl AlignmentParameters {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("gap_open_penalty", self.gap_open_penalty),
            ("gap_extend_penalty", self.gap_extend_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidatorError::invalid_parameter(
                    name,
                    value,
                    "must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

/// Local alignment of a query against a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairwiseAlignment {
    pub aligned_query: String,
    pub aligned_target: String,
    /// 0-based offset of the first aligned target base
    pub target_start: usize,
    pub score: i32,
}

/// Ungapped core of an alignment, expressed on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRegion {
    /// 0-based half-open target range
    pub target_from: usize,
    pub target_to: usize,
    /// Alignment columns between the first and last base-to-base column
    pub length: usize,
    /// Differing columns in that span, gaps included
    pub mismatches: usize,
}

impl MatchRegion {
    pub fn matches(&self) -> usize {
        self.length - self.mismatches
    }

    pub fn identity_percent(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        self.matches() as f64 / self.length as f64 * 100.0
    }
}

impl PairwiseAlignment {
    /// Locate the region between the first and last column where both rows have a base
    pub fn match_region(&self) -> Option<MatchRegion> {
        let query = self.aligned_query.as_bytes();
        let target = self.aligned_target.as_bytes();

        let mut target_pos = self.target_start;
        let mut first: Option<(usize, usize)> = None;
        let mut last: Option<(usize, usize)> = None;
        for (column, (&q, &t)) in query.iter().zip(target).enumerate() {
            if q != GAP && t != GAP {
                if first.is_none() {
                    first = Some((column, target_pos));
                }
                last = Some((column, target_pos));
            }
            if t != GAP {
                target_pos += 1;
            }
        }

        let ((first_column, target_from), (last_column, last_target)) = (first?, last?);
        let mismatches = (first_column..=last_column)
            .filter(|&c| !query[c].eq_ignore_ascii_case(&target[c]))
            .count();

        Some(MatchRegion {
            target_from,
            target_to: last_target + 1,
            length: last_column - first_column + 1,
            mismatches,
        })
    }
}

/// Local (Smith-Waterman family) alignment primitive
pub trait LocalAligner: Send + Sync {
    /// Best local alignment of `query` within `target`, `None` when nothing scores above zero
    fn align(
        &self,
        query: &str,
        target: &str,
        parameters: &AlignmentParameters,
    ) -> Result<Option<PairwiseAlignment>>;
}

/// Affine-gap Smith-Waterman from rust-bio
#[derive(Debug, Clone, Copy, Default)]
pub struct BioLocalAligner;

impl LocalAligner for BioLocalAligner {
    fn align(
        &self,
        query: &str,
        target: &str,
        parameters: &AlignmentParameters,
    ) -> Result<Option<PairwiseAlignment>> {
        parameters.validate()?;
        if query.is_empty() || target.is_empty() {
            return Ok(None);
        }

        let x = query.to_ascii_uppercase().into_bytes();
        let y = target.to_ascii_uppercase().into_bytes();
        let scores = parameters.scores;
        let mut aligner = Aligner::with_capacity(
            x.len(),
            y.len(),
            -(parameters.gap_open_penalty.round() as i32),
            -(parameters.gap_extend_penalty.round() as i32),
            move |a: u8, b: u8| scores.score(a, b),
        );
        let alignment = aligner.local(&x, &y);
        if alignment.score <= 0 {
            return Ok(None);
        }

        let mut aligned_query = String::new();
        let mut aligned_target = String::new();
        let (mut xi, mut yi) = (alignment.xstart, alignment.ystart);
        for op in &alignment.operations {
            match op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    aligned_query.push(x[xi] as char);
                    aligned_target.push(y[yi] as char);
                    xi += 1;
                    yi += 1;
                }
                AlignmentOperation::Ins => {
                    aligned_query.push(x[xi] as char);
                    aligned_target.push(GAP as char);
                    xi += 1;
                }
                AlignmentOperation::Del => {
                    aligned_query.push(GAP as char);
                    aligned_target.push(y[yi] as char);
                    yi += 1;
                }
                // Clipped flanks are outside the local region
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }

        if xi > x.len() || yi > y.len() {
            return Err(ValidatorError::Alignment {
                message: format!(
                    "alignment walked past the inputs ({xi}/{}, {yi}/{})",
                    x.len(),
                    y.len()
                ),
            });
        }

        Ok(Some(PairwiseAlignment {
            aligned_query,
            aligned_target,
            target_start: alignment.ystart,
            score: alignment.score,
        }))
    }
}
