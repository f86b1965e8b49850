//! Per-barcode pipeline
//!
//! Stages run in a fixed order: trimming, assembly, consensus, trace validation and
//! consensus validation. A failure inside one trace or consensus becomes a failing
//! validation row for that unit only. Assembler failures and configuration errors
//! abort the barcode. Cancellation aborts everything and is reported on its own.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::cancel::CancellationToken;
use super::progress::{CompositeProgress, PipelineStage, ProgressListener};
use crate::alignment::LocalAligner;
use crate::assembly::{build_consensus, Assembler, AssemblyOptions};
use crate::core::data_structures::Sequence;
use crate::core::errors::{Result, ValidatorError};
use crate::core::pipeline_types::{
    BarcodeInput, ConsensusRecord, PipelineOutputBuilder, PipelineOutputRecord, RunStatus,
    TrimmedTrace,
};
use crate::core::trimmage::Trimmage;
use crate::qc::sequence_trimmer::{collect_stats, SequenceTrimmer, TrimmingOptions};
use crate::validation::result::{ResultFact, ValidationEntry, ValidationRun, ValidationStage};
use crate::validation::{Validation, ValidationOptions, ValidationRegistry};

/// Everything a barcode run needs besides its inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub trimming: TrimmingOptions,
    /// Trimming applied to consensus sequences; falls back to `trimming`
    pub consensus_trimming: Option<TrimmingOptions>,
    pub assembly: AssemblyOptions,
    /// One entry per registered validation, matched by identifier
    pub validations: Vec<ValidationOptions>,
}

impl PipelineOptions {
    /// Options with defaults for every validation in `registry`
    pub fn with_defaults_for(registry: &ValidationRegistry) -> Self {
        Self {
            validations: registry.default_options(),
            ..Self::default()
        }
    }
}

/// How one barcode ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BarcodeOutcome {
    Completed { record: Box<PipelineOutputRecord> },
    Failed { barcode: String, reason: String },
    Canceled { barcode: String },
}

impl BarcodeOutcome {
    pub fn barcode_name(&self) -> &str {
        match self {
            BarcodeOutcome::Completed { record } => &record.barcode_name,
            BarcodeOutcome::Failed { barcode, .. } | BarcodeOutcome::Canceled { barcode } => {
                barcode
            }
        }
    }

    pub fn record(&self) -> Option<&PipelineOutputRecord> {
        match self {
            BarcodeOutcome::Completed { record } => Some(&**record),
            _ => None,
        }
    }
}

/// A sequence under validation together with why it could not be produced, if so
struct Subject<'a> {
    sequence: &'a mut Sequence,
    error: Option<&'a str>,
}

pub struct Pipeline {
    registry: Arc<ValidationRegistry>,
    assembler: Arc<dyn Assembler>,
    options: PipelineOptions,
    trimmer: SequenceTrimmer,
    consensus_trimmer: SequenceTrimmer,
}

impl Pipeline {
    pub fn new(
        registry: Arc<ValidationRegistry>,
        assembler: Arc<dyn Assembler>,
        aligner: Arc<dyn LocalAligner>,
        options: PipelineOptions,
    ) -> Result<Self> {
        let trimmer = SequenceTrimmer::new(options.trimming.clone(), Arc::clone(&aligner))?;
        let consensus_options = options
            .consensus_trimming
            .clone()
            .unwrap_or_else(|| options.trimming.clone());
        let consensus_trimmer = SequenceTrimmer::new(consensus_options, aligner)?;

        Ok(Self {
            registry,
            assembler,
            options,
            trimmer,
            consensus_trimmer,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Every registered validation has matching, well-formed options and nothing extra
    pub fn check_configuration(&self) -> Result<()> {
        self.options.assembly.validate()?;

        for validation in self.registry.iter() {
            let options = self.options_for(validation.identifier())?;
            options.ensure_identifier(validation.identifier())?;
            options.params.validate()?;
        }

        for options in &self.options.validations {
            if self.registry.get(&options.identifier).is_none() {
                return Err(ValidatorError::ConfigurationMismatch {
                    expected: self.registry.identifiers().join(", "),
                    found: options.identifier.clone(),
                });
            }
        }
        Ok(())
    }

    fn options_for(&self, identifier: &str) -> Result<&ValidationOptions> {
        self.options
            .validations
            .iter()
            .find(|options| options.identifier == identifier)
            .ok_or_else(|| ValidatorError::MissingOptions {
                identifier: identifier.to_string(),
            })
    }

    /// Run several barcodes one after another
    ///
    /// Configuration problems fail the whole call before any barcode starts. After
    /// that each barcode ends on its own as completed, failed or canceled.
    pub fn run_all(
        &self,
        inputs: &[BarcodeInput],
        listener: &dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<Vec<BarcodeOutcome>> {
        self.check_configuration()?;
        let progress = CompositeProgress::new(listener);
        let start = Instant::now();

        let outcomes: Vec<BarcodeOutcome> = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let barcode = input.name().to_string();
                match self.run_in(input, progress.part(index, inputs.len()), cancel) {
                    Ok(record) => BarcodeOutcome::Completed {
                        record: Box::new(record),
                    },
                    Err(ValidatorError::Canceled) => {
                        warn!("⏹️  Barcode '{}' canceled", barcode);
                        BarcodeOutcome::Canceled { barcode }
                    }
                    Err(e) => {
                        error!("❌ Barcode '{}' failed: {}", barcode, e);
                        BarcodeOutcome::Failed {
                            barcode,
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .collect();

        let completed = outcomes
            .iter()
            .filter(|outcome| outcome.record().is_some())
            .count();
        info!(
            "✅ Processed {} barcodes in {:.2}s: {} completed",
            inputs.len(),
            start.elapsed().as_secs_f64(),
            completed
        );
        Ok(outcomes)
    }

    /// Run every stage for one barcode
    pub fn run_barcode(
        &self,
        input: &BarcodeInput,
        listener: &dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutputRecord> {
        self.check_configuration()?;
        self.run_in(input, CompositeProgress::new(listener), cancel)
    }

    #[instrument(skip_all, fields(barcode = %input.name()))]
    fn run_in(
        &self,
        input: &BarcodeInput,
        progress: CompositeProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutputRecord> {
        info!(
            "🧬 Processing barcode '{}' with {} traces",
            input.name(),
            input.traces.len()
        );
        let mut builder = PipelineOutputBuilder::new(input.name());

        self.trim_traces(input, &mut builder, progress.stage(PipelineStage::Trimming), cancel)?;

        let contig_count = self.assemble(
            &mut builder,
            progress.stage(PipelineStage::Assembly),
            progress.stage(PipelineStage::Consensus),
            cancel,
        )?;

        self.validate_traces(
            &input.barcode,
            &mut builder,
            progress.stage(PipelineStage::TraceValidation),
            cancel,
        )?;

        let consensus_progress = progress.stage(PipelineStage::ConsensusValidation);
        if builder.consensus().is_empty() {
            consensus_progress.complete("No consensus to validate");
        } else {
            self.validate_consensus(&input.barcode, &mut builder, consensus_progress, cancel)?;
        }

        let status = if contig_count == 0 {
            RunStatus::CompletedWithoutContigs
        } else {
            RunStatus::Completed
        };
        let record = builder.finish(status);
        info!(
            "✅ Barcode '{}' done in {:.2}s: {} contigs, {} failed rows",
            record.barcode_name,
            record.duration_seconds(),
            contig_count,
            record.failed_fact_count()
        );
        Ok(record)
    }

    fn trim_traces(
        &self,
        input: &BarcodeInput,
        builder: &mut PipelineOutputBuilder,
        progress: CompositeProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        cancel.check()?;
        let total = input.traces.len();
        let done = AtomicUsize::new(0);

        let outcomes: Vec<_> = input
            .traces
            .par_iter()
            .map(|trace| {
                cancel.check()?;
                let outcome = self.trimmer.trim(trace);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                progress.report_items(finished, total, PipelineStage::Trimming.description());
                Ok::<_, ValidatorError>(outcome)
            })
            .collect::<Result<Vec<_>>>()?;

        let stats = collect_stats(&input.traces, &outcomes);
        let traces = input
            .traces
            .iter()
            .zip(outcomes)
            .map(|(trace, outcome)| match outcome {
                Ok(outcome) => TrimmedTrace {
                    original_length: trace.len(),
                    sequence: outcome.sequence,
                    trimmage: outcome.trimmage,
                    primer_trimmage: outcome.primer_trimmage,
                    quality_trimmage: outcome.quality_trimmage,
                    error: None,
                },
                Err(e) => {
                    warn!("Trimming trace '{}' failed: {}", trace.name, e);
                    TrimmedTrace {
                        original_length: trace.len(),
                        sequence: trace.clone(),
                        trimmage: Trimmage::EMPTY,
                        primer_trimmage: Trimmage::EMPTY,
                        quality_trimmage: Trimmage::EMPTY,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        info!(
            "✂️  Trimmed {} traces: {} kept, {} emptied, {} failed",
            stats.traces_input, stats.traces_kept, stats.traces_emptied, stats.traces_failed
        );
        builder.set_traces(traces, stats);
        progress.complete("Trimming done");
        Ok(())
    }

    /// Assemble usable traces; returns the contig count
    fn assemble(
        &self,
        builder: &mut PipelineOutputBuilder,
        progress: CompositeProgress<'_>,
        consensus_progress: CompositeProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        cancel.check()?;
        let usable: Vec<Sequence> = builder
            .traces()
            .iter()
            .filter(|trace| trace.is_assemblable())
            .map(|trace| trace.sequence.clone())
            .collect();

        let contigs = if usable.is_empty() {
            warn!("No usable traces left after trimming, skipping assembly");
            Vec::new()
        } else {
            info!(
                "🧩 Assembling {} traces with {}",
                usable.len(),
                self.assembler.name()
            );
            self.assembler.assemble(&usable, &self.options.assembly)?
        };
        progress.complete("Assembly done");
        info!("🧩 Assembly produced {} contigs", contigs.len());

        for (index, contig) in contigs.iter().enumerate() {
            cancel.check()?;
            let consensus = build_consensus(contig);
            let untrimmed_length = consensus.len();
            let read_names = contig.read_names().into_iter().map(String::from).collect();

            let record = match self.consensus_trimmer.trim(&consensus) {
                Ok(outcome) => ConsensusRecord {
                    contig_name: contig.name.clone(),
                    read_names,
                    untrimmed_length,
                    trimmage: outcome.trimmage,
                    sequence: outcome.sequence,
                    error: None,
                },
                Err(e) => {
                    warn!("Trimming consensus '{}' failed: {}", contig.name, e);
                    ConsensusRecord {
                        contig_name: contig.name.clone(),
                        read_names,
                        untrimmed_length,
                        trimmage: Trimmage::EMPTY,
                        sequence: consensus,
                        error: Some(e.to_string()),
                    }
                }
            };
            debug!(
                "Consensus '{}': {} of {} bases kept",
                record.contig_name,
                record.sequence.len(),
                untrimmed_length
            );
            builder.add_consensus(record);
            consensus_progress.report_items(
                index + 1,
                contigs.len(),
                PipelineStage::Consensus.description(),
            );
        }
        consensus_progress.complete("Consensus done");
        Ok(contigs.len())
    }

    fn validate_traces(
        &self,
        barcode: &Sequence,
        builder: &mut PipelineOutputBuilder,
        progress: CompositeProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let count = self.registry.len();
        for (index, validation) in self.registry.iter().enumerate() {
            let options = self.options_for(validation.identifier())?;
            let mut subjects: Vec<Subject<'_>> = builder
                .traces_mut()
                .iter_mut()
                .map(|trace| Subject {
                    sequence: &mut trace.sequence,
                    error: trace.error.as_deref(),
                })
                .collect();
            let run = run_validation(
                validation,
                options,
                ValidationStage::Trace,
                barcode,
                &mut subjects,
                progress.part(index, count),
                cancel,
            )?;
            builder.add_validation_run(run);
        }
        progress.complete("Trace validation done");
        Ok(())
    }

    fn validate_consensus(
        &self,
        barcode: &Sequence,
        builder: &mut PipelineOutputBuilder,
        progress: CompositeProgress<'_>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let count = self.registry.len();
        for (index, validation) in self.registry.iter().enumerate() {
            let options = self.options_for(validation.identifier())?;
            let mut subjects: Vec<Subject<'_>> = builder
                .consensus_mut()
                .iter_mut()
                .map(|record| Subject {
                    sequence: &mut record.sequence,
                    error: record.error.as_deref(),
                })
                .collect();
            let run = run_validation(
                validation,
                options,
                ValidationStage::Consensus,
                barcode,
                &mut subjects,
                progress.part(index, count),
                cancel,
            )?;
            builder.add_validation_run(run);
        }
        progress.complete("Consensus validation done");
        Ok(())
    }
}

/// Apply one validation to every subject in parallel, in subject order
fn run_validation(
    validation: &Validation,
    options: &ValidationOptions,
    stage: ValidationStage,
    barcode: &Sequence,
    subjects: &mut [Subject<'_>],
    progress: CompositeProgress<'_>,
    cancel: &CancellationToken,
) -> Result<ValidationRun> {
    let total = subjects.len();
    let done = AtomicUsize::new(0);

    let entries = subjects
        .par_iter_mut()
        .map(|subject| {
            cancel.check()?;
            let name = subject.sequence.name.clone();
            let fact = match validate_subject(validation, options, barcode, subject) {
                Ok(fact) => fact,
                Err(ValidatorError::Canceled) => return Err(ValidatorError::Canceled),
                Err(e) => {
                    warn!(
                        "Validation '{}' failed on '{}': {}",
                        validation.identifier(),
                        name,
                        e
                    );
                    ResultFact::failure(name.as_str(), e.to_string())
                }
            };
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress.report_items(finished, total, &options.label);
            Ok(ValidationEntry {
                subject: name,
                fact,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let run = ValidationRun::new(options.clone(), stage, entries);
    debug!(
        "Validation '{}' on {:?}: {} rows, {} failed",
        options.identifier,
        stage,
        run.entries.len(),
        run.failed_count()
    );
    Ok(run)
}

fn validate_subject(
    validation: &Validation,
    options: &ValidationOptions,
    barcode: &Sequence,
    subject: &mut Subject<'_>,
) -> Result<ResultFact> {
    let name = subject.sequence.name.clone();
    if let Some(error) = subject.error {
        return Ok(ResultFact::failure(name, format!("Trimming failed: {error}")));
    }
    if subject.sequence.is_empty() {
        return Ok(ResultFact::failure(name, "No bases left after trimming"));
    }

    match validation {
        Validation::SingleSequence(single) => {
            single.validate_and_annotate(&mut *subject.sequence, options)
        }
        Validation::SequenceCompare(compare) => {
            compare.validate(&*subject.sequence, barcode, options)
        }
    }
}
