//! Error-probability end trimming (modified Mott algorithm)
//!
//! Each base confidence `c` is converted to an error probability `p = 10^(c / -10)`.
//! A region scores `Σ (p - cutoff)`; the kept region is the one with the most negative
//! score. A region qualifies only while its score stays `<= 0`.

use crate::core::data_structures::{Sequence, TrimEnds};
use crate::core::trimmage::Trimmage;

/// Highest confidence value with a cached error probability
pub const MAX_CONFIDENCE: i32 = 100;

/// Default error probability limit for trace trimming
pub const DEFAULT_ERROR_PROBABILITY_LIMIT: f64 = 0.05;

/// Mott-style trimmer with a pre-computed confidence -> error probability table
#[derive(Debug, Clone)]
pub struct ErrorProbabilityTrimmer {
    error_probability_limit: f64,
    /// Lookup table for confidences 0..=100
    error_lookup: [f64; MAX_CONFIDENCE as usize + 1],
}

impl Default for ErrorProbabilityTrimmer {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_PROBABILITY_LIMIT)
    }
}

impl ErrorProbabilityTrimmer {
    pub fn new(error_probability_limit: f64) -> Self {
        let mut error_lookup = [0.0; MAX_CONFIDENCE as usize + 1];
        for (confidence, slot) in error_lookup.iter_mut().enumerate() {
            *slot = confidence_to_error_probability(confidence as i32);
        }

        Self {
            error_probability_limit,
            error_lookup,
        }
    }

    pub fn error_probability_limit(&self) -> f64 {
        self.error_probability_limit
    }

    #[inline(always)]
    fn error_probability(&self, confidence: i32) -> f64 {
        self.error_lookup[confidence.clamp(0, MAX_CONFIDENCE) as usize]
    }

    /// Trim a sequence; without a quality track the whole sequence is discarded
    pub fn trim(&self, sequence: &Sequence, ends: TrimEnds) -> Trimmage {
        match sequence.quality.as_deref() {
            Some(qualities) => self.trim_qualities(qualities, ends),
            None => Trimmage::discard_all(sequence.len()),
        }
    }

    /// Trim a bare quality track
    pub fn trim_qualities(&self, qualities: &[i32], ends: TrimEnds) -> Trimmage {
        let length = qualities.len();
        if length == 0 {
            return Trimmage::EMPTY;
        }

        let scores: Vec<f64> = qualities
            .iter()
            .map(|&q| self.error_probability(q) - self.error_probability_limit)
            .collect();

        let kept = match ends {
            TrimEnds::Both => best_segment(&scores),
            TrimEnds::Start => best_suffix(&scores),
            TrimEnds::End => best_prefix(&scores),
        };

        match kept {
            Some((from, to)) => Trimmage::new(from, length - to),
            None => Trimmage::discard_all(length),
        }
    }
}

/// `10^(c / -10)`
pub fn confidence_to_error_probability(confidence: i32) -> f64 {
    10_f64.powf(confidence as f64 / -10.0)
}

/// Non-empty segment `[from, to)` with the minimal score not exceeding zero.
///
/// Ties prefer the longer segment, then the earliest start.
fn best_segment(scores: &[f64]) -> Option<(usize, usize)> {
    let mut best: Option<(f64, usize, usize)> = None;

    // Minimal-sum segment ending at each index; extend whenever the running score is
    // not positive so equal-score segments grow to their longest form
    let mut current_start = 0;
    let mut current_score = 0.0;
    for (index, &score) in scores.iter().enumerate() {
        if index == 0 || current_score > 0.0 {
            current_start = index;
            current_score = score;
        } else {
            current_score += score;
        }

        if current_score > 0.0 {
            continue;
        }

        let candidate = (current_score, current_start, index + 1);
        best = match best {
            None => Some(candidate),
            Some(previous) if is_better(candidate, previous) => Some(candidate),
            keep => keep,
        };
    }

    best.map(|(_, from, to)| (from, to))
}

fn is_better(candidate: (f64, usize, usize), previous: (f64, usize, usize)) -> bool {
    let (score, from, to) = candidate;
    let (best_score, best_from, best_to) = previous;
    if score != best_score {
        return score < best_score;
    }
    let (length, best_length) = (to - from, best_to - best_from);
    if length != best_length {
        return length > best_length;
    }
    from < best_from
}

/// Keep `[k, len)`: scan inward from the end, ties prefer the longer suffix
fn best_suffix(scores: &[f64]) -> Option<(usize, usize)> {
    let mut running = 0.0;
    let mut best: Option<(f64, usize)> = None;
    for index in (0..scores.len()).rev() {
        running += scores[index];
        if running <= 0.0 && best.map_or(true, |(score, _)| running <= score) {
            best = Some((running, index));
        }
    }
    best.map(|(_, from)| (from, scores.len()))
}

/// Keep `[0, k)`: scan inward from the start, ties prefer the longer prefix
fn best_prefix(scores: &[f64]) -> Option<(usize, usize)> {
    let mut running = 0.0;
    let mut best: Option<(f64, usize)> = None;
    for (index, &score) in scores.iter().enumerate() {
        running += score;
        if running <= 0.0 && best.map_or(true, |(best_score, _)| running <= best_score) {
            best = Some((running, index + 1));
        }
    }
    best.map(|(_, to)| (0, to))
}
