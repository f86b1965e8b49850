//! Trim regions confirmed for a sequence

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{Result, ValidatorError};

/// Number of bases to remove from each end of a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Trimmage {
    pub trim_at_start: usize,
    pub trim_at_end: usize,
}

impl Trimmage {
    /// No trimming at either end
    pub const EMPTY: Trimmage = Trimmage {
        trim_at_start: 0,
        trim_at_end: 0,
    };

    pub fn new(trim_at_start: usize, trim_at_end: usize) -> Self {
        Self {
            trim_at_start,
            trim_at_end,
        }
    }

    /// Discard the whole sequence. By convention everything is removed from the start.
    pub fn discard_all(length: usize) -> Self {
        Self::new(length, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.trim_at_start == 0 && self.trim_at_end == 0
    }

    pub fn total(&self) -> usize {
        self.trim_at_start + self.trim_at_end
    }

    /// Bases left after trimming a sequence of `length`, zero when over-trimmed
    pub fn remaining(&self, length: usize) -> usize {
        length.saturating_sub(self.total())
    }

    /// Check that applying this Trimmage to a sequence of `length` cannot overflow
    pub fn validate_for(&self, length: usize) -> Result<()> {
        if self.total() > length {
            return Err(ValidatorError::invalid_parameter(
                "trimmage",
                self,
                format!("removes more bases than the sequence length {length}"),
            ));
        }
        Ok(())
    }

    /// Trimming applied after this one on the already-trimmed sequence
    pub fn combine_sequential(&self, next: &Trimmage) -> Trimmage {
        Trimmage::new(
            self.trim_at_start + next.trim_at_start,
            self.trim_at_end + next.trim_at_end,
        )
    }

    /// Worst case of two alternative trims on the same sequence
    pub fn max(&self, other: &Trimmage) -> Trimmage {
        Trimmage::new(
            self.trim_at_start.max(other.trim_at_start),
            self.trim_at_end.max(other.trim_at_end),
        )
    }

    /// Clamp the trim so it never exceeds `length`, keeping the discard-all convention
    pub fn clamped_to(&self, length: usize) -> Trimmage {
        if self.total() >= length {
            Trimmage::discard_all(length)
        } else {
            *self
        }
    }
}

impl fmt::Display for Trimmage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.trim_at_start, self.trim_at_end)
    }
}
