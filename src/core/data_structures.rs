use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{Result, ValidatorError};
use super::trimmage::Trimmage;

/// Core sequence types for barcode trace validation
/// A trace or consensus is a nucleotide string with optional parallel tracks

/// Nucleotide sequence with optional per-base confidence values and chromatogram peaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub description: String,
    /// Uppercase IUPAC nucleotide symbols
    pub bases: String,
    /// Phred-like confidence per base (0-100)
    pub quality: Option<Vec<i32>>,
    /// Chromatogram peak position per base
    pub trace_positions: Option<Vec<usize>>,
    pub annotations: Vec<Annotation>,
}

impl Sequence {
    /// Sequence without quality information (barcodes, primers).
    /// Symbols outside ASCII are stored as `N`.
    pub fn new(name: impl Into<String>, bases: &str) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            bases: bases
                .chars()
                .map(|c| if c.is_ascii() { c.to_ascii_uppercase() } else { 'N' })
                .collect(),
            quality: None,
            trace_positions: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_quality(name: impl Into<String>, bases: &str, quality: Vec<i32>) -> Result<Self> {
        let sequence = Self {
            quality: Some(quality),
            ..Self::new(name, bases)
        };
        sequence.check()?;
        Ok(sequence)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_trace_positions(mut self, positions: Vec<usize>) -> Result<Self> {
        if positions.len() != self.bases.len() {
            return Err(ValidatorError::invalid_parameter(
                "trace_positions",
                positions.len(),
                format!("'{}' has {} bases", self.name, self.bases.len()),
            ));
        }
        self.trace_positions = Some(positions);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Bases are ASCII and every parallel track has one entry per base.
    /// The fields are public, so sequences built by hand or deserialized may break this.
    pub fn check(&self) -> Result<()> {
        if let Some(position) = self.bases.find(|c: char| !c.is_ascii()) {
            return Err(ValidatorError::invalid_parameter(
                "bases",
                &self.name,
                format!("non-ASCII symbol at byte {}", position),
            ));
        }
        let tracks = [
            ("quality", self.quality.as_ref().map(Vec::len)),
            ("trace_positions", self.trace_positions.as_ref().map(Vec::len)),
        ];
        for (track, length) in tracks {
            match length {
                Some(length) if length != self.len() => {
                    return Err(ValidatorError::invalid_parameter(
                        track,
                        length,
                        format!("'{}' has {} bases", self.name, self.len()),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn has_quality(&self) -> bool {
        self.quality.is_some()
    }

    pub fn base_at(&self, index: usize) -> u8 {
        self.bases.as_bytes()[index]
    }

    pub fn quality_at(&self, index: usize) -> Option<i32> {
        self.quality.as_ref().and_then(|q| q.get(index).copied())
    }

    /// Quality track or a [`ValidatorError::MissingQualityData`] error
    pub fn require_quality(&self) -> Result<&[i32]> {
        self.quality
            .as_deref()
            .ok_or_else(|| ValidatorError::MissingQualityData {
                sequence: self.name.clone(),
            })
    }

    /// Copy of this sequence with the trimmed bases removed from every track
    pub fn trimmed(&self, trimmage: &Trimmage) -> Result<Sequence> {
        self.check()?;
        trimmage.validate_for(self.len())?;
        if trimmage.is_empty() {
            return Ok(self.clone());
        }

        let from = trimmage.trim_at_start;
        let to = self.len() - trimmage.trim_at_end;
        let annotations = self
            .annotations
            .iter()
            .filter_map(|annotation| annotation.sliced(from, to))
            .collect();

        Ok(Sequence {
            name: self.name.clone(),
            description: self.description.clone(),
            bases: self.bases[from..to].to_string(),
            quality: self.quality.as_ref().map(|q| q[from..to].to_vec()),
            trace_positions: self.trace_positions.as_ref().map(|p| p[from..to].to_vec()),
            annotations,
        })
    }

    /// Reverse complement, reversing the parallel tracks and dropping annotations
    pub fn reverse_complement(&self) -> Sequence {
        Sequence {
            name: self.name.clone(),
            description: self.description.clone(),
            bases: reverse_complement(&self.bases),
            quality: self.quality.as_ref().map(|q| q.iter().rev().copied().collect()),
            trace_positions: self
                .trace_positions
                .as_ref()
                .map(|p| p.iter().rev().copied().collect()),
            annotations: Vec::new(),
        }
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bp)", self.name, self.len())
    }
}

/// Closed interval with 1-based coordinates, the annotation convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Convert a 0-based half-open range
    pub fn from_zero_based(from: usize, to: usize) -> Self {
        Self {
            start: from + 1,
            end: to,
        }
    }

    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Merge overlapping or adjacent intervals into a minimal sorted set
    pub fn merge_all(mut intervals: Vec<Interval>) -> Vec<Interval> {
        intervals.sort();
        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match merged.last_mut() {
                Some(last) if interval.start <= last.end + 1 => {
                    last.end = last.end.max(interval.end);
                }
                _ => merged.push(interval),
            }
        }
        merged
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Named set of intervals attached to a sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub intervals: Vec<Interval>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, intervals: Vec<Interval>) -> Self {
        Self {
            name: name.into(),
            intervals,
        }
    }

    /// Restrict to the kept 0-based range `[from, to)` and shift into the new coordinates
    fn sliced(&self, from: usize, to: usize) -> Option<Annotation> {
        let intervals: Vec<Interval> = self
            .intervals
            .iter()
            .filter_map(|interval| {
                let start = interval.start.max(from + 1);
                let end = interval.end.min(to);
                (start <= end).then(|| Interval::new(start - from, end - from))
            })
            .collect();

        (!intervals.is_empty()).then(|| Annotation::new(self.name.clone(), intervals))
    }
}

/// Which ends of a sequence a trimmer may remove bases from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimEnds {
    Start,
    End,
    #[default]
    Both,
}

/// True for A, C, G and T; every other IUPAC symbol is ambiguous
pub fn is_unambiguous_base(base: u8) -> bool {
    matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

pub fn complement_base(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        // S, W, N and gaps are their own complement
        other => other,
    }
}

pub fn reverse_complement(bases: &str) -> String {
    bases
        .bytes()
        .rev()
        .map(|b| complement_base(b) as char)
        .collect()
}
