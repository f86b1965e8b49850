//! Full barcode runs against an in-process assembler

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use barcode_validator::alignment::{BioLocalAligner, LocalAligner};
use barcode_validator::assembly::{AlignedRead, Assembler, AssemblyOptions, Contig};
use barcode_validator::core::errors::Result as ValidatorResult;
use barcode_validator::core::pipeline_types::{BarcodeInput, RunStatus};
use barcode_validator::pipeline::{
    BarcodeOutcome, CancellationToken, NoProgress, Pipeline, PipelineOptions, ProgressListener,
};
use barcode_validator::utils::format_writers::{read_fasta, read_fastq};
use barcode_validator::validation::{ValidationRegistry, ValidationStage};
use barcode_validator::Sequence;

const BARCODE: &str = "ACCTTATATTTTATTTTTGGAGCTTGAGCTGGAATAGTAGGAACTTCATTAAGAATTTTAATTCGAGCAGAATTAGGTCAACCAGG";

/// Places every trace at offset 0 of a single contig
#[derive(Default)]
struct StackingAssembler {
    seen: AtomicUsize,
}

impl Assembler for StackingAssembler {
    fn name(&self) -> &str {
        "stacking"
    }

    fn assemble(&self, traces: &[Sequence], _options: &AssemblyOptions) -> ValidatorResult<Vec<Contig>> {
        self.seen.fetch_add(traces.len(), Ordering::SeqCst);
        Ok(vec![Contig {
            name: "Contig1".to_string(),
            padded_consensus: String::new(),
            reads: traces.iter().map(|t| AlignedRead::ungapped(t, 0)).collect(),
        }])
    }
}

#[derive(Default)]
struct Recorder {
    fractions: Mutex<Vec<f64>>,
}

impl ProgressListener for Recorder {
    fn report(&self, fraction: f64, _message: &str) {
        self.fractions.lock().unwrap().push(fraction);
    }
}

/// Cancels the run on the first progress report
struct CancelOnReport(CancellationToken);

impl ProgressListener for CancelOnReport {
    fn report(&self, _fraction: f64, _message: &str) {
        self.0.cancel();
    }
}

fn write_inputs(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let barcode_path = dir.join("barcode.fasta");
    let mut barcode = std::fs::File::create(&barcode_path).unwrap();
    writeln!(barcode, ">BOLD-1 reference\n{BARCODE}").unwrap();

    // Trailing low quality bases on the first trace, a hopeless second trace
    let traces_path = dir.join("traces.fastq");
    let mut traces = std::fs::File::create(&traces_path).unwrap();
    let good_quality = format!("{}{}", "I".repeat(BARCODE.len() - 3), "#".repeat(3));
    writeln!(traces, "@BOLD-1_F\n{BARCODE}\n+\n{good_quality}").unwrap();
    writeln!(traces, "@BOLD-1_R\n{BARCODE}\n+\n{}", "#".repeat(BARCODE.len())).unwrap();
    (barcode_path, traces_path)
}

fn pipeline(assembler: Arc<dyn Assembler>) -> Pipeline {
    let aligner: Arc<dyn LocalAligner> = Arc::new(BioLocalAligner);
    let registry = Arc::new(ValidationRegistry::with_defaults(Arc::clone(&aligner)));
    let mut options = PipelineOptions::with_defaults_for(&registry);
    options.trimming.enable_primer_trimming = false;
    Pipeline::new(registry, assembler, aligner, options).unwrap()
}

fn load_input() -> BarcodeInput {
    let dir = tempfile::tempdir().unwrap();
    let (barcode_path, traces_path) = write_inputs(dir.path());
    let barcode = read_fasta(&barcode_path).unwrap().remove(0);
    BarcodeInput::new(barcode, read_fastq(&traces_path).unwrap())
}

#[test]
fn files_to_output_record() {
    let assembler = Arc::new(StackingAssembler::default());
    let pipeline = pipeline(assembler.clone());
    let recorder = Recorder::default();

    let outcomes = pipeline
        .run_all(&[load_input()], &recorder, &CancellationToken::new())
        .unwrap();
    let record = outcomes[0].record().expect("barcode should complete");

    // Only the usable trace reaches the assembler
    assert_eq!(assembler.seen.load(Ordering::SeqCst), 1);
    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.traces.len(), 2);
    assert_eq!(record.traces[0].sequence.len(), BARCODE.len() - 3);
    assert!(record.traces[1].sequence.is_empty());

    assert_eq!(record.runs_for(ValidationStage::Trace).count(), 3);
    assert_eq!(record.runs_for(ValidationStage::Consensus).count(), 3);
    for run in record.runs_for(ValidationStage::Trace) {
        assert!(run.entries[0].fact.pass(), "{} on trace", run.options.identifier);
        assert!(!run.entries[1].fact.pass());
    }
    assert_eq!(record.consensus.len(), 1);
    assert_eq!(record.consensus[0].read_names, vec!["BOLD-1_F".to_string()]);

    let fractions = recorder.fractions.lock().unwrap();
    let last = *fractions.last().unwrap();
    assert!((last - 1.0).abs() < 1e-9);
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));

    let json = serde_json::to_string(&outcomes).unwrap();
    assert!(json.contains("\"outcome\":\"completed\""));
    assert!(json.contains("\"barcode_name\":\"BOLD-1\""));
}

#[test]
fn cancellation_during_run() {
    let pipeline = pipeline(Arc::new(StackingAssembler::default()));
    let cancel = CancellationToken::new();
    let listener = CancelOnReport(cancel.clone());

    let outcomes = pipeline.run_all(&[load_input()], &listener, &cancel).unwrap();
    assert!(matches!(outcomes[0], BarcodeOutcome::Canceled { .. }));
}

#[test]
fn barcodes_run_independently() {
    let pipeline = pipeline(Arc::new(StackingAssembler::default()));
    let first = load_input();
    let mut second = load_input();
    second.barcode.name = "BOLD-2".to_string();
    second.traces.truncate(1);

    let outcomes = pipeline
        .run_all(&[first, second], &NoProgress, &CancellationToken::new())
        .unwrap();
    let names: Vec<&str> = outcomes.iter().map(BarcodeOutcome::barcode_name).collect();
    assert_eq!(names, vec!["BOLD-1", "BOLD-2"]);
    assert!(outcomes[1].record().unwrap().all_passed());
}

#[test]
fn damaged_trace_becomes_failing_row() {
    let assembler = Arc::new(StackingAssembler::default());
    let pipeline = pipeline(assembler.clone());
    let mut input = load_input();

    // A 0xFF byte decoded lossily upstream, as a deserialized record would carry it
    let mut raw = BARCODE.as_bytes().to_vec();
    raw[10] = 0xFF;
    let mut damaged = input.traces[0].clone();
    damaged.name = "BOLD-1_X".to_string();
    damaged.bases = String::from_utf8_lossy(&raw).into_owned();
    input.traces.push(damaged);

    let outcomes = pipeline
        .run_all(&[input], &NoProgress, &CancellationToken::new())
        .unwrap();
    let record = outcomes[0].record().expect("barcode should complete");

    assert_eq!(assembler.seen.load(Ordering::SeqCst), 1);
    assert_eq!(record.traces.len(), 3);
    let error = record.traces[2].error.as_deref().expect("trimming should fail");
    assert!(error.contains("non-ASCII"), "{error}");
    assert!(record.traces[0].error.is_none());

    for run in record.runs_for(ValidationStage::Trace) {
        assert_eq!(run.entries.len(), 3);
        assert_eq!(run.entries[2].subject, "BOLD-1_X");
        assert!(!run.entries[2].fact.pass());
        assert!(run.entries[0].fact.pass());
    }
}
