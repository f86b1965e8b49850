//! Criteria-based end trimming
//!
//! Generalises the error-probability trimmer to any set of [`Criterion`]s:
//! - Both ends: longest window in which no criterion exceeds its failure budget
//! - One end: extend from the kept end until a budget would be exceeded

use crate::core::data_structures::{Interval, Sequence, TrimEnds};
use crate::core::trimmage::Trimmage;

use super::criteria::{Criterion, FailureCounter};

/// Trimmer evaluating several criteria jointly, each with its own failure budget
#[derive(Debug, Default)]
pub struct BaseCriteriaTrimmer {
    criteria: Vec<Box<dyn Criterion>>,
}

impl BaseCriteriaTrimmer {
    pub fn new(criteria: Vec<Box<dyn Criterion>>) -> Self {
        Self { criteria }
    }

    pub fn with_criterion(mut self, criterion: impl Criterion + 'static) -> Self {
        self.criteria.push(Box::new(criterion));
        self
    }

    pub fn criteria(&self) -> &[Box<dyn Criterion>] {
        &self.criteria
    }

    pub fn trim(&self, sequence: &Sequence, ends: TrimEnds) -> Trimmage {
        let length = sequence.len();
        if length == 0 {
            return Trimmage::EMPTY;
        }

        let kept = match ends {
            TrimEnds::Both => self.longest_window(sequence),
            TrimEnds::Start => self.extend_towards_start(sequence),
            TrimEnds::End => self.extend_towards_end(sequence),
        };

        match kept {
            Some((from, to)) => Trimmage::new(from, length - to),
            None => Trimmage::discard_all(length),
        }
    }

    /// Best region across both ends as a 1-based closed interval
    pub fn best_interval(&self, sequence: &Sequence) -> Option<Interval> {
        self.longest_window(sequence)
            .map(|(from, to)| Interval::from_zero_based(from, to))
    }

    /// Shrinking-window search; ties keep the earliest window
    fn longest_window(&self, sequence: &Sequence) -> Option<(usize, usize)> {
        let mut counters = FailureCounter::for_all(&self.criteria);
        let mut best: Option<(usize, usize)> = None;
        let mut from = 0;

        for to in 0..sequence.len() {
            counters.iter_mut().for_each(|c| c.enter(sequence, to));

            while from <= to && counters.iter().any(FailureCounter::exceeded) {
                counters.iter_mut().for_each(|c| c.leave(sequence, from));
                from += 1;
            }

            if from > to {
                continue;
            }
            let length = to + 1 - from;
            if best.map_or(true, |(f, t)| length > t - f) {
                best = Some((from, to + 1));
            }
        }

        best
    }

    /// Keep `[from, len)`: the end stays, bases are added towards the start
    fn extend_towards_start(&self, sequence: &Sequence) -> Option<(usize, usize)> {
        let length = sequence.len();
        let mut counters = FailureCounter::for_all(&self.criteria);
        let mut from = length;

        for index in (0..length).rev() {
            counters.iter_mut().for_each(|c| c.enter(sequence, index));
            if counters.iter().any(FailureCounter::exceeded) {
                break;
            }
            from = index;
        }

        (from < length).then_some((from, length))
    }

    /// Keep `[0, to)`: the start stays, bases are added towards the end
    fn extend_towards_end(&self, sequence: &Sequence) -> Option<(usize, usize)> {
        let mut counters = FailureCounter::for_all(&self.criteria);
        let mut to = 0;

        for index in 0..sequence.len() {
            counters.iter_mut().for_each(|c| c.enter(sequence, index));
            if counters.iter().any(FailureCounter::exceeded) {
                break;
            }
            to = index + 1;
        }

        (to > 0).then_some((0, to))
    }
}
