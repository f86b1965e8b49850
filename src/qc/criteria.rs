//! Per-base trimming criteria
//!
//! A criterion decides whether a single base is acceptable and how many unacceptable
//! bases a kept region may contain. Trimmers keep one [`FailureCounter`] per criterion
//! while sliding their candidate window.

use std::fmt;

use crate::core::data_structures::{is_unambiguous_base, Sequence};

/// Pass/fail predicate for a single base with a failure budget
pub trait Criterion: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Whether the base at `index` (0-based) is acceptable
    fn meets(&self, sequence: &Sequence, index: usize) -> bool;

    /// Failing bases tolerated inside a kept region
    fn allowed_failures(&self) -> usize;
}

/// Bases must reach a minimum confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityCriterion {
    pub min_quality: i32,
    pub allowed_failures: usize,
}

impl QualityCriterion {
    pub fn new(min_quality: i32, allowed_failures: usize) -> Self {
        Self {
            min_quality,
            allowed_failures,
        }
    }
}

impl Criterion for QualityCriterion {
    fn name(&self) -> &str {
        "quality"
    }

    fn meets(&self, sequence: &Sequence, index: usize) -> bool {
        // No quality track means nothing can be confirmed
        sequence
            .quality_at(index)
            .is_some_and(|q| q >= self.min_quality)
    }

    fn allowed_failures(&self) -> usize {
        self.allowed_failures
    }
}

/// Bases must be one of A, C, G or T
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbiguityCriterion {
    pub allowed_failures: usize,
}

impl AmbiguityCriterion {
    pub fn new(allowed_failures: usize) -> Self {
        Self { allowed_failures }
    }
}

impl Criterion for AmbiguityCriterion {
    fn name(&self) -> &str {
        "ambiguity"
    }

    fn meets(&self, sequence: &Sequence, index: usize) -> bool {
        is_unambiguous_base(sequence.base_at(index))
    }

    fn allowed_failures(&self) -> usize {
        self.allowed_failures
    }
}

/// Live count of failing bases inside the current window for one criterion
#[derive(Debug)]
pub struct FailureCounter<'a> {
    criterion: &'a dyn Criterion,
    failed: usize,
}

impl<'a> FailureCounter<'a> {
    pub fn new(criterion: &'a dyn Criterion) -> Self {
        Self {
            criterion,
            failed: 0,
        }
    }

    pub fn for_all(criteria: &'a [Box<dyn Criterion>]) -> Vec<FailureCounter<'a>> {
        criteria.iter().map(|c| FailureCounter::new(c.as_ref())).collect()
    }

    /// Account for a base entering the window
    pub fn enter(&mut self, sequence: &Sequence, index: usize) {
        if !self.criterion.meets(sequence, index) {
            self.failed += 1;
        }
    }

    /// Account for a base leaving the window
    pub fn leave(&mut self, sequence: &Sequence, index: usize) {
        if !self.criterion.meets(sequence, index) {
            self.failed = self.failed.saturating_sub(1);
        }
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn exceeded(&self) -> bool {
        self.failed > self.criterion.allowed_failures()
    }

    pub fn criterion_name(&self) -> &str {
        self.criterion.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_criterion() {
        let seq = Sequence::with_quality("s", "ACGT", vec![10, 20, 30, 19]).unwrap();
        let criterion = QualityCriterion::new(20, 0);
        let passing: Vec<bool> = (0..4).map(|i| criterion.meets(&seq, i)).collect();
        assert_eq!(passing, vec![false, true, true, false]);
    }

    #[test]
    fn test_quality_criterion_without_quality_fails() {
        let seq = Sequence::new("s", "ACGT");
        assert!(!QualityCriterion::new(0, 0).meets(&seq, 0));
    }

    #[test]
    fn test_ambiguity_criterion() {
        let seq = Sequence::new("s", "ANRT");
        let criterion = AmbiguityCriterion::new(1);
        assert!(criterion.meets(&seq, 0));
        assert!(!criterion.meets(&seq, 1));
        assert!(!criterion.meets(&seq, 2));
        assert!(criterion.meets(&seq, 3));
    }

    #[test]
    fn test_failure_counter_budget() {
        let seq = Sequence::new("s", "NNAN");
        let criterion = AmbiguityCriterion::new(1);
        let mut counter = FailureCounter::new(&criterion);

        counter.enter(&seq, 0);
        assert!(!counter.exceeded());
        counter.enter(&seq, 1);
        assert!(counter.exceeded());
        counter.leave(&seq, 0);
        assert_eq!(counter.failed(), 1);
        counter.enter(&seq, 2);
        assert_eq!(counter.failed(), 1);
        assert_eq!(counter.criterion_name(), "ambiguity");
    }
}
