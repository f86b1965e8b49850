use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use barcode_validator::alignment::{BioLocalAligner, LocalAligner};
use barcode_validator::assembly::Cap3Assembler;
use barcode_validator::core::pipeline_types::BarcodeInput;
use barcode_validator::pipeline::{BarcodeOutcome, CancellationToken, NoProgress, Pipeline, ProgressListener};
use barcode_validator::qc::{SequenceTrimmer, TrimmingPreset};
use barcode_validator::scoring::PciProgram;
use barcode_validator::utils::configuration::{generate_config_template, ConfigurationManager};
use barcode_validator::utils::format_writers::{read_fasta, read_sequences};
use barcode_validator::utils::TerminalProgress;
use barcode_validator::validation::ValidationRegistry;
use barcode_validator::Sequence;

#[derive(Parser)]
#[command(name = "barcode-validator")]
#[command(about = "Trim, assemble and validate DNA barcode traces")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the output records as JSON
    Validate {
        /// FASTA file with one record per barcode
        #[arg(long)]
        barcode: PathBuf,

        /// FASTQ (or FASTA) trace files
        #[arg(long, num_args = 1.., required = true)]
        traces: Vec<PathBuf>,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CAP3 executable
        #[arg(long)]
        cap3: Option<PathBuf>,

        /// Trimming preset overriding the configured trace trimming
        #[arg(long)]
        preset: Option<TrimmingPreset>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Trim traces and print the Trimmage of each
    Trim {
        #[arg(long, num_args = 1.., required = true)]
        traces: Vec<PathBuf>,

        #[arg(long)]
        preset: Option<TrimmingPreset>,
    },
    /// Score new samples with the PCI program
    Score {
        /// Aligned FASTA named by UID (Genus_Species_Name)
        #[arg(long)]
        alignment: PathBuf,

        /// UIDs of the new samples
        #[arg(long = "uid", num_args = 1.., required = true)]
        uids: Vec<String>,
    },
    /// Configuration helpers
    Config {
        /// Write a configuration template to this path
        #[arg(long)]
        template: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { template } = &cli.command {
        generate_config_template(template)
            .with_context(|| format!("writing template to {}", template.display()))?;
        println!("✅ Configuration template written to {}", template.display());
        return Ok(());
    }

    let mut manager = match &cli.config {
        Some(path) => ConfigurationManager::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ConfigurationManager::new().context("loading configuration")?,
    };
    if cli.verbose {
        manager.config_mut().logging.level = "debug".to_string();
    }
    manager.setup_logging()?;

    let threads = manager.config().effective_threads();
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        warn!("Could not size the worker pool: {}", e);
    }

    match cli.command {
        Commands::Validate {
            barcode,
            traces,
            output,
            cap3,
            preset,
            no_progress,
        } => {
            if let Some(cap3) = cap3 {
                manager.config_mut().assembly.cap3.executable = cap3;
            }
            if let Some(preset) = preset {
                manager.config_mut().trimming.traces = preset.into();
            }
            run_validate(&manager, &barcode, &traces, output.as_deref(), !no_progress)
        }
        Commands::Trim { traces, preset } => {
            if let Some(preset) = preset {
                manager.config_mut().trimming.traces = preset.into();
            }
            run_trim(&manager, &traces)
        }
        Commands::Score { alignment, uids } => run_score(&manager, &alignment, &uids),
        Commands::Config { .. } => Ok(()),
    }
}

fn load_traces(paths: &[PathBuf]) -> Result<Vec<Sequence>> {
    let mut traces = Vec::new();
    for path in paths {
        let mut sequences =
            read_sequences(path).with_context(|| format!("reading traces from {}", path.display()))?;
        traces.append(&mut sequences);
    }
    Ok(traces)
}

/// A trace belongs to the barcode whose name prefixes it; one barcode takes every trace
fn group_traces(barcodes: Vec<Sequence>, traces: Vec<Sequence>) -> Vec<BarcodeInput> {
    if barcodes.len() == 1 {
        return barcodes
            .into_iter()
            .map(|barcode| BarcodeInput::new(barcode, traces.clone()))
            .collect();
    }

    let mut inputs: Vec<BarcodeInput> = barcodes
        .into_iter()
        .map(|barcode| BarcodeInput::new(barcode, Vec::new()))
        .collect();
    for trace in traces {
        let owner = inputs
            .iter_mut()
            .filter(|input| trace.name.starts_with(input.name()))
            .max_by_key(|input| input.name().len());
        match owner {
            Some(input) => input.traces.push(trace),
            None => warn!("Trace '{}' matches no barcode, skipping", trace.name),
        }
    }
    inputs
}

fn run_validate(
    manager: &ConfigurationManager,
    barcode_path: &Path,
    trace_paths: &[PathBuf],
    output: Option<&Path>,
    show_progress: bool,
) -> Result<()> {
    let config = manager.config();
    let barcodes = read_fasta(barcode_path)
        .with_context(|| format!("reading barcodes from {}", barcode_path.display()))?;
    if barcodes.is_empty() {
        bail!("No barcodes found in {}", barcode_path.display());
    }
    let inputs = group_traces(barcodes, load_traces(trace_paths)?);
    info!("📂 Loaded {} barcodes", inputs.len());

    let aligner: Arc<dyn LocalAligner> = Arc::new(BioLocalAligner);
    let registry = Arc::new(ValidationRegistry::with_defaults(Arc::clone(&aligner)));
    let assembler = Arc::new(Cap3Assembler::new(config.assembly.cap3.clone()));
    let pipeline = Pipeline::new(registry, assembler, aligner, config.pipeline_options())?;

    let cancel = CancellationToken::new();
    let terminal = TerminalProgress::new();
    let listener: &dyn ProgressListener = if show_progress { &terminal } else { &NoProgress };
    let outcomes = pipeline.run_all(&inputs, listener, &cancel)?;
    if show_progress {
        terminal.finish("Validation complete");
    }

    let json = serde_json::to_string_pretty(&outcomes)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing results to {}", path.display()))?;
            info!("💾 Results written to {}", path.display());
        }
        None => println!("{json}"),
    }

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, BarcodeOutcome::Failed { .. }))
        .map(BarcodeOutcome::barcode_name)
        .collect();
    for outcome in &outcomes {
        if let Some(record) = outcome.record() {
            info!(
                "📊 {}: {:?}, {} consensus, {} failed rows",
                record.barcode_name,
                record.status,
                record.consensus.len(),
                record.failed_fact_count()
            );
        }
    }
    if !failed.is_empty() {
        bail!("{} barcodes failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn run_trim(manager: &ConfigurationManager, trace_paths: &[PathBuf]) -> Result<()> {
    let traces = load_traces(trace_paths)?;
    let trimmer = SequenceTrimmer::new(
        manager.config().trimming.traces.clone(),
        Arc::new(BioLocalAligner),
    )?;

    let (outcomes, stats) = trimmer.trim_all_with_stats(&traces);
    for (trace, outcome) in traces.iter().zip(&outcomes) {
        match outcome {
            Ok(outcome) => println!(
                "{}\t{}\t{}\t{}",
                trace.name,
                trace.len(),
                outcome.trimmage,
                outcome.sequence.len()
            ),
            Err(e) => println!("{}\t{}\terror: {}", trace.name, trace.len(), e),
        }
    }
    info!(
        "✂️  {} traces: {} kept, {} emptied, {} failed",
        stats.traces_input, stats.traces_kept, stats.traces_emptied, stats.traces_failed
    );
    Ok(())
}

fn run_score(manager: &ConfigurationManager, alignment_path: &Path, uids: &[String]) -> Result<()> {
    let alignment = read_fasta(alignment_path)
        .with_context(|| format!("reading alignment from {}", alignment_path.display()))?;
    let program = PciProgram::new(manager.config().scoring.pci.clone());
    let scores: BTreeMap<String, f64> = program.score(&alignment, uids)?.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&scores)?);
    Ok(())
}
