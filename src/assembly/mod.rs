//! Trace assembly
//!
//! Assembly itself is delegated to an external program behind the [`Assembler`] trait.
//! This module holds the contig model, option ranges, the ACE importer and the
//! consensus builder.

use serde::{Deserialize, Serialize};

use crate::core::data_structures::Sequence;
use crate::core::errors::{Result, ValidatorError};

pub mod ace;
pub mod cap3;
pub mod consensus;

pub use cap3::{Cap3Assembler, Cap3Config};
pub use consensus::build_consensus;

/// Gap symbol inside padded sequences
pub const PAD: u8 = b'-';

/// Overlap thresholds passed to the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    /// Minimum overlap length in bases (16-1000)
    pub min_overlap_length: usize,
    /// Minimum overlap identity in percent (66-1000)
    pub min_overlap_identity: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            min_overlap_length: 40,
            min_overlap_identity: 90,
        }
    }
}

impl AssemblyOptions {
    pub const OVERLAP_LENGTH_RANGE: (usize, usize) = (16, 1000);
    // Upper bound above 100 is accepted as-is
    pub const OVERLAP_IDENTITY_RANGE: (usize, usize) = (66, 1000);

    pub fn validate(&self) -> Result<()> {
        let (min, max) = Self::OVERLAP_LENGTH_RANGE;
        if !(min..=max).contains(&self.min_overlap_length) {
            return Err(ValidatorError::invalid_parameter(
                "min_overlap_length",
                self.min_overlap_length,
                format!("must be in {min}..={max}"),
            ));
        }
        let (min, max) = Self::OVERLAP_IDENTITY_RANGE;
        if !(min..=max).contains(&self.min_overlap_identity) {
            return Err(ValidatorError::invalid_parameter(
                "min_overlap_identity",
                self.min_overlap_identity,
                format!("must be in {min}..={max}"),
            ));
        }
        Ok(())
    }
}

/// A read placed on a contig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRead {
    pub name: String,
    /// 0-based padded contig column of the first read symbol; negative when the read
    /// hangs over the contig start
    pub offset: i64,
    /// Read symbols with [`PAD`] for gaps
    pub padded_bases: String,
    /// One value per non-gap base, in read order
    pub quality: Option<Vec<i32>>,
    pub reverse_complemented: bool,
    /// 1-based padded read positions that take part in the alignment
    pub clip: Option<(usize, usize)>,
}

impl AlignedRead {
    /// Read placed without gaps
    pub fn ungapped(sequence: &Sequence, offset: i64) -> Self {
        Self {
            name: sequence.name.clone(),
            offset,
            padded_bases: sequence.bases.clone(),
            quality: sequence.quality.clone(),
            reverse_complemented: false,
            clip: None,
        }
    }

    pub fn padded_len(&self) -> usize {
        self.padded_bases.len()
    }

    pub fn end(&self) -> i64 {
        self.offset + self.padded_len() as i64
    }

    /// Whether 0-based padded read position `index` lies inside the clip range
    pub fn in_clip(&self, index: usize) -> bool {
        self.clip
            .map_or(true, |(start, end)| index + 1 >= start && index < end)
    }
}

/// Contig produced by the assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contig {
    pub name: String,
    /// Assembler consensus with [`PAD`] gaps, may be empty when only reads are known
    pub padded_consensus: String,
    pub reads: Vec<AlignedRead>,
}

impl Contig {
    pub fn read_names(&self) -> Vec<&str> {
        self.reads.iter().map(|read| read.name.as_str()).collect()
    }
}

/// External assembler contract
pub trait Assembler: Send + Sync {
    fn name(&self) -> &str;

    /// Assemble trimmed traces; an empty result is valid
    fn assemble(&self, traces: &[Sequence], options: &AssemblyOptions) -> Result<Vec<Contig>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_valid() {
        assert!(AssemblyOptions::default().validate().is_ok());
    }

    #[test]
    fn test_overlap_length_range() {
        for (length, ok) in [(15, false), (16, true), (1000, true), (1001, false)] {
            let options = AssemblyOptions {
                min_overlap_length: length,
                ..Default::default()
            };
            assert_eq!(options.validate().is_ok(), ok, "length {length}");
        }
    }

    #[test]
    fn test_overlap_identity_upper_bound_anomaly() {
        // Identity is a percentage, yet values up to 1000 are accepted
        for (identity, ok) in [(65, false), (66, true), (100, true), (1000, true), (1001, false)] {
            let options = AssemblyOptions {
                min_overlap_identity: identity,
                ..Default::default()
            };
            assert_eq!(options.validate().is_ok(), ok, "identity {identity}");
        }
    }

    #[test]
    fn test_clip_range() {
        let mut read = AlignedRead::ungapped(&Sequence::new("r", "ACGTACGT"), 0);
        assert!(read.in_clip(0));
        read.clip = Some((3, 5));
        assert!(!read.in_clip(1));
        assert!(read.in_clip(2));
        assert!(read.in_clip(4));
        assert!(!read.in_clip(5));
        assert_eq!(read.end(), 8);
    }
}
