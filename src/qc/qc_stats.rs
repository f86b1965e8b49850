//! Trimming statistics
//!
//! Tracks how many bases the trimming stage removed and why

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-run trimming statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrimmingStats {
    pub traces_input: usize,
    pub traces_kept: usize,
    pub traces_emptied: usize,
    pub traces_failed: usize,

    pub total_bases_before: usize,
    pub total_bases_after: usize,
    pub bases_trimmed_quality: usize,
    pub bases_trimmed_primer: usize,

    /// Primer sequence -> traces it was found in
    pub primer_hits: HashMap<String, usize>,
    pub traces_without_quality: usize,

    pub mean_quality_before: f64,
    pub mean_quality_after: f64,
    pub mean_length_before: f64,
    pub mean_length_after: f64,
}

impl TrimmingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an input trace
    pub fn record_input(&mut self, length: usize, quality: Option<&[i32]>) {
        self.traces_input += 1;
        self.total_bases_before += length;
        match quality {
            Some(q) => self.mean_quality_before += mean_quality(q),
            None => self.traces_without_quality += 1,
        }
    }

    /// Record a trimmed trace; empty results count as emptied rather than kept
    pub fn record_trimmed(&mut self, length: usize, quality: Option<&[i32]>) {
        if length == 0 {
            self.traces_emptied += 1;
            return;
        }
        self.traces_kept += 1;
        self.total_bases_after += length;
        if let Some(q) = quality {
            self.mean_quality_after += mean_quality(q);
        }
    }

    pub fn record_failed(&mut self) {
        self.traces_failed += 1;
    }

    pub fn record_quality_trimming(&mut self, bases: usize) {
        self.bases_trimmed_quality += bases;
    }

    pub fn record_primer_trimming(&mut self, primers: &[String], bases: usize) {
        self.bases_trimmed_primer += bases;
        for primer in primers {
            *self.primer_hits.entry(primer.clone()).or_insert(0) += 1;
        }
    }

    /// Turn accumulated sums into averages
    pub fn finalize(&mut self) {
        let with_quality = self.traces_input - self.traces_without_quality;
        if with_quality > 0 {
            self.mean_quality_before /= with_quality as f64;
        }
        if self.traces_input > 0 {
            self.mean_length_before = self.total_bases_before as f64 / self.traces_input as f64;
        }
        if self.traces_kept > 0 {
            self.mean_quality_after /= self.traces_kept as f64;
            self.mean_length_after = self.total_bases_after as f64 / self.traces_kept as f64;
        }
    }
}

fn mean_quality(quality: &[i32]) -> f64 {
    if quality.is_empty() {
        return 0.0;
    }
    quality.iter().map(|&q| q as f64).sum::<f64>() / quality.len() as f64
}
