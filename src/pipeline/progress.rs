//! Progress reporting
//!
//! Work is split hierarchically: a run over several barcodes gives each barcode an
//! equal slice, each barcode splits its slice over the pipeline stages by weight, and
//! each stage divides its share over the items it processes. Listeners only ever see
//! the overall fraction in `[0, 1]`.

use serde::{Deserialize, Serialize};

/// Receives overall progress; may be called from worker threads
pub trait ProgressListener: Send + Sync {
    fn report(&self, fraction: f64, message: &str);
}

/// Listener that drops every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn report(&self, _fraction: f64, _message: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Trimming,
    Assembly,
    Consensus,
    TraceValidation,
    ConsensusValidation,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::Trimming,
        PipelineStage::Assembly,
        PipelineStage::Consensus,
        PipelineStage::TraceValidation,
        PipelineStage::ConsensusValidation,
    ];

    /// Share of a barcode's progress; the weights sum to 1
    pub fn weight(self) -> f64 {
        match self {
            PipelineStage::Trimming => 0.3,
            PipelineStage::Assembly => 0.3,
            PipelineStage::Consensus => 0.1,
            PipelineStage::TraceValidation => 0.2,
            PipelineStage::ConsensusValidation => 0.1,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PipelineStage::Trimming => "Trimming traces",
            PipelineStage::Assembly => "Assembling contigs",
            PipelineStage::Consensus => "Building consensus",
            PipelineStage::TraceValidation => "Validating traces",
            PipelineStage::ConsensusValidation => "Validating consensus",
        }
    }

    fn start(self) -> f64 {
        Self::ALL
            .iter()
            .take_while(|stage| **stage != self)
            .map(|stage| stage.weight())
            .sum()
    }
}

/// A sub-range of the overall progress
#[derive(Clone, Copy)]
pub struct CompositeProgress<'a> {
    listener: &'a dyn ProgressListener,
    start: f64,
    span: f64,
}

impl<'a> CompositeProgress<'a> {
    pub fn new(listener: &'a dyn ProgressListener) -> Self {
        Self {
            listener,
            start: 0.0,
            span: 1.0,
        }
    }

    /// Sub-range `[from, from + width)` of this range, both relative to it
    pub fn slice(&self, from: f64, width: f64) -> CompositeProgress<'a> {
        let from = from.clamp(0.0, 1.0);
        let width = width.clamp(0.0, 1.0 - from);
        CompositeProgress {
            listener: self.listener,
            start: self.start + self.span * from,
            span: self.span * width,
        }
    }

    /// Slice `index` of `count` equal slices
    pub fn part(&self, index: usize, count: usize) -> CompositeProgress<'a> {
        if count == 0 {
            return *self;
        }
        let width = 1.0 / count as f64;
        self.slice(index as f64 * width, width)
    }

    pub fn stage(&self, stage: PipelineStage) -> CompositeProgress<'a> {
        self.slice(stage.start(), stage.weight())
    }

    pub fn report(&self, fraction: f64, message: &str) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.listener.report(self.start + self.span * fraction, message);
    }

    pub fn report_items(&self, done: usize, total: usize, message: &str) {
        let fraction = if total == 0 { 1.0 } else { done as f64 / total as f64 };
        self.report(fraction, message);
    }

    pub fn complete(&self, message: &str) {
        self.report(1.0, message);
    }
}
