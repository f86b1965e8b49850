//! Pipeline Data Types
//!
//! Inputs and per-barcode results of a validation run. The output record is assembled
//! stage by stage through [`PipelineOutputBuilder`] and is read-only once finished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::data_structures::Sequence;
use super::trimmage::Trimmage;
use crate::qc::qc_stats::TrimmingStats;
use crate::validation::result::{ValidationRun, ValidationStage};

/// One barcode and the traces sequenced for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeInput {
    pub barcode: Sequence,
    pub traces: Vec<Sequence>,
}

impl BarcodeInput {
    pub fn new(barcode: Sequence, traces: Vec<Sequence>) -> Self {
        Self { barcode, traces }
    }

    pub fn name(&self) -> &str {
        &self.barcode.name
    }
}

/// A trace after the trimming stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimmedTrace {
    /// Trimmed bases are omitted, not masked
    pub sequence: Sequence,
    pub original_length: usize,
    pub trimmage: Trimmage,
    pub primer_trimmage: Trimmage,
    pub quality_trimmage: Trimmage,
    /// Why trimming failed; the untrimmed trace is kept in `sequence`
    pub error: Option<String>,
}

impl TrimmedTrace {
    pub fn name(&self) -> &str {
        &self.sequence.name
    }

    /// Usable for assembly
    pub fn is_assemblable(&self) -> bool {
        self.error.is_none() && !self.sequence.is_empty()
    }
}

/// Consensus of one contig, after trimming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusRecord {
    pub contig_name: String,
    pub read_names: Vec<String>,
    pub untrimmed_length: usize,
    pub trimmage: Trimmage,
    pub sequence: Sequence,
    /// Why trimming failed; the untrimmed consensus is kept in `sequence`
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Assembly produced nothing; only trace validations were run
    CompletedWithoutContigs,
}

/// Everything produced for one barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutputRecord {
    pub barcode_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub traces: Vec<TrimmedTrace>,
    pub consensus: Vec<ConsensusRecord>,
    pub validation_runs: Vec<ValidationRun>,
    pub trimming_stats: TrimmingStats,
}

impl PipelineOutputRecord {
    pub fn runs_for(&self, stage: ValidationStage) -> impl Iterator<Item = &ValidationRun> {
        self.validation_runs.iter().filter(move |run| run.stage == stage)
    }

    /// Every validation row passed
    pub fn all_passed(&self) -> bool {
        self.validation_runs.iter().all(ValidationRun::passed)
    }

    pub fn failed_fact_count(&self) -> usize {
        self.validation_runs.iter().map(ValidationRun::failed_count).sum()
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Incrementally built output of a running barcode
#[derive(Debug, Clone)]
pub struct PipelineOutputBuilder {
    barcode_name: String,
    started_at: DateTime<Utc>,
    traces: Vec<TrimmedTrace>,
    consensus: Vec<ConsensusRecord>,
    validation_runs: Vec<ValidationRun>,
    trimming_stats: TrimmingStats,
}

impl PipelineOutputBuilder {
    pub fn new(barcode_name: impl Into<String>) -> Self {
        Self {
            barcode_name: barcode_name.into(),
            started_at: Utc::now(),
            traces: Vec::new(),
            consensus: Vec::new(),
            validation_runs: Vec::new(),
            trimming_stats: TrimmingStats::default(),
        }
    }

    pub fn set_traces(&mut self, traces: Vec<TrimmedTrace>, stats: TrimmingStats) {
        self.traces = traces;
        self.trimming_stats = stats;
    }

    pub fn traces(&self) -> &[TrimmedTrace] {
        &self.traces
    }

    pub fn traces_mut(&mut self) -> &mut [TrimmedTrace] {
        &mut self.traces
    }

    pub fn add_consensus(&mut self, record: ConsensusRecord) {
        self.consensus.push(record);
    }

    pub fn consensus(&self) -> &[ConsensusRecord] {
        &self.consensus
    }

    pub fn consensus_mut(&mut self) -> &mut [ConsensusRecord] {
        &mut self.consensus
    }

    pub fn add_validation_run(&mut self, run: ValidationRun) {
        self.validation_runs.push(run);
    }

    pub fn finish(self, status: RunStatus) -> PipelineOutputRecord {
        PipelineOutputRecord {
            barcode_name: self.barcode_name,
            status,
            started_at: self.started_at,
            finished_at: Utc::now(),
            traces: self.traces,
            consensus: self.consensus,
            validation_runs: self.validation_runs,
            trimming_stats: self.trimming_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::result::{ResultFact, ValidationEntry};
    use crate::validation::{SingleSequenceValidation, StopCodonValidation};

    fn run(stage: ValidationStage, passed: bool) -> ValidationRun {
        ValidationRun::new(
            StopCodonValidation.default_options(),
            stage,
            vec![ValidationEntry {
                subject: "trace".to_string(),
                fact: ResultFact::new("trace", passed),
            }],
        )
    }

    #[test]
    fn test_builder_collects_stages() {
        let mut builder = PipelineOutputBuilder::new("BOLD-1");
        builder.add_validation_run(run(ValidationStage::Trace, true));
        builder.add_validation_run(run(ValidationStage::Consensus, false));
        let record = builder.finish(RunStatus::Completed);

        assert_eq!(record.barcode_name, "BOLD-1");
        assert_eq!(record.runs_for(ValidationStage::Trace).count(), 1);
        assert!(!record.all_passed());
        assert_eq!(record.failed_fact_count(), 1);
        assert!(record.finished_at >= record.started_at);
    }

    #[test]
    fn test_trimmed_trace_assemblable() {
        let trace = TrimmedTrace {
            sequence: Sequence::new("t", ""),
            original_length: 10,
            trimmage: Trimmage::discard_all(10),
            primer_trimmage: Trimmage::EMPTY,
            quality_trimmage: Trimmage::discard_all(10),
            error: None,
        };
        assert!(!trace.is_assemblable());
    }

    #[test]
    fn test_record_serializes() {
        let record = PipelineOutputBuilder::new("BOLD-1").finish(RunStatus::CompletedWithoutContigs);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"completed_without_contigs\""));
    }
}
