//! CAP3 execution
//!
//! Writes the trimmed traces to FASTA (plus `.qual` when every trace has qualities),
//! runs CAP3 in the FASTA directory and imports `<fasta>.cap.ace`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::ace::parse_ace_file;
use super::{Assembler, AssemblyOptions, Contig};
use crate::core::data_structures::Sequence;
use crate::core::errors::{Result, ValidatorError};
use crate::utils::format_writers::{write_fasta, write_qual};

const FASTA_NAME: &str = "traces.fasta";

/// CAP3 execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cap3Config {
    /// Path to the cap3 executable
    pub executable: PathBuf,
    /// Run the executable through this program, e.g. a shell for wrapper scripts
    pub interpreter: Option<PathBuf>,
    /// Keep input and output files here instead of a temporary directory
    pub work_dir: Option<PathBuf>,
}

impl Default for Cap3Config {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("cap3"),
            interpreter: None,
            work_dir: None,
        }
    }
}

/// CAP3 backed [`Assembler`]
#[derive(Debug, Clone, Default)]
pub struct Cap3Assembler {
    config: Cap3Config,
}

impl Cap3Assembler {
    pub fn new(config: Cap3Config) -> Self {
        Self { config }
    }

    fn program_name(&self) -> String {
        self.config.executable.display().to_string()
    }

    fn process_failure(&self, exit_code: Option<i32>, stderr: impl Into<String>) -> ValidatorError {
        ValidatorError::ExternalProcessFailure {
            program: self.program_name(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Command line for one FASTA input
    pub fn command(&self, fasta_path: &Path, options: &AssemblyOptions) -> Command {
        let mut cmd = match &self.config.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.config.executable);
                cmd
            }
            None => Command::new(&self.config.executable),
        };
        cmd.arg(fasta_path)
            .arg("-o")
            .arg(options.min_overlap_length.to_string())
            .arg("-p")
            .arg(options.min_overlap_identity.to_string());
        if let Some(dir) = fasta_path.parent() {
            cmd.current_dir(dir);
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }

    fn run_in(&self, dir: &Path, traces: &[Sequence], options: &AssemblyOptions) -> Result<Vec<Contig>> {
        let fasta_path = dir.join(FASTA_NAME);
        write_fasta(traces, &fasta_path)?;
        let mut qual_path = fasta_path.clone().into_os_string();
        qual_path.push(".qual");
        if write_qual(traces, &qual_path)? {
            debug!("   Quality file: {}", PathBuf::from(&qual_path).display());
        }

        let mut cmd = self.command(&fasta_path, options);
        info!("   Launching CAP3 on {} traces", traces.len());
        debug!("   Command: {:?}", cmd);

        let start_time = Instant::now();
        let output = cmd
            .output()
            .map_err(|e| self.process_failure(None, format!("failed to launch: {e}")))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                debug!("   CAP3: {}", trimmed);
            }
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        info!(
            "   CAP3 completed with exit code {:?} in {:.2}s",
            output.status.code(),
            start_time.elapsed().as_secs_f64()
        );
        if !output.status.success() {
            error!("CAP3 failed: {}", stderr);
            return Err(self.process_failure(output.status.code(), stderr));
        }
        if !stderr.is_empty() {
            warn!("   CAP3 stderr: {}", stderr);
        }

        let mut ace_path: OsString = fasta_path.into_os_string();
        ace_path.push(".cap.ace");
        let ace_path = PathBuf::from(ace_path);
        if !ace_path.exists() {
            return Err(self.process_failure(
                output.status.code(),
                format!("no assembly written to {}", ace_path.display()),
            ));
        }

        let mut contigs = parse_ace_file(&ace_path)?;
        attach_qualities(&mut contigs, traces);
        Ok(contigs)
    }
}

/// Copy trace qualities onto the imported reads, reversed for complemented reads
fn attach_qualities(contigs: &mut [Contig], traces: &[Sequence]) {
    let by_name: AHashMap<&str, &Sequence> = traces.iter().map(|t| (t.name.as_str(), t)).collect();

    for read in contigs.iter_mut().flat_map(|c| c.reads.iter_mut()) {
        let Some(quality) = by_name.get(read.name.as_str()).and_then(|t| t.quality.as_ref()) else {
            continue;
        };
        let bases = read.padded_bases.bytes().filter(|&b| b != super::PAD).count();
        if bases != quality.len() {
            warn!(
                "Read {} has {} bases in the assembly but {} qualities, ignoring qualities",
                read.name,
                bases,
                quality.len()
            );
            continue;
        }
        read.quality = Some(if read.reverse_complemented {
            quality.iter().rev().copied().collect()
        } else {
            quality.clone()
        });
    }
}

impl Assembler for Cap3Assembler {
    fn name(&self) -> &str {
        "CAP3"
    }

    fn assemble(&self, traces: &[Sequence], options: &AssemblyOptions) -> Result<Vec<Contig>> {
        options.validate()?;
        if traces.is_empty() {
            return Ok(Vec::new());
        }

        let contigs = match &self.config.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                self.run_in(&dir.canonicalize()?, traces, options)?
            }
            None => {
                let dir = tempfile::tempdir()?;
                self.run_in(dir.path(), traces, options)?
            }
        };

        info!("   CAP3 produced {} contigs", contigs.len());
        Ok(contigs)
    }
}
