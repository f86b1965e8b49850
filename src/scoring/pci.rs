//! PCI (probability of correct identification) scoring
//!
//! Runs the external Perl PCI program on an alignment of new samples against reference
//! barcodes. Samples are identified by UIDs of the form `Genus_Species_Name`.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::core::data_structures::Sequence;
use crate::core::errors::{Result, ValidatorError};
use crate::utils::format_writers::write_fasta;

/// PCI program configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PciConfig {
    pub interpreter: PathBuf,
    /// Path to the PCI script
    pub script: PathBuf,
}

impl Default for PciConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("perl"),
            script: PathBuf::from("pci.pl"),
        }
    }
}

/// Replace runs of whitespace and underscores with a single `-`
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.trim().chars() {
        if c.is_whitespace() || c == '_' {
            if !in_run {
                sanitized.push('-');
            }
            in_run = true;
        } else {
            sanitized.push(c);
            in_run = false;
        }
    }
    sanitized
}

/// `Genus_Species_SanitizedName`
pub fn make_uid(genus: &str, species: &str, name: &str) -> String {
    format!("{}_{}_{}", genus.trim(), species.trim(), sanitize_name(name))
}

/// Parse `UID value` lines, keeping only UIDs of new samples
pub fn parse_pci_output(text: &str, new_uids: &AHashSet<String>) -> Result<AHashMap<String, f64>> {
    let mut scores = AHashMap::new();
    for (index, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let (Some(uid), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        if !new_uids.contains(uid) {
            continue;
        }
        let score: f64 = value.parse().map_err(|_| {
            ValidatorError::parse("PCI output", format!("line {}: invalid score '{value}'", index + 1))
        })?;
        scores.insert(uid.to_string(), score);
    }
    Ok(scores)
}

/// PCI scoring of new samples against an alignment of published ones.
///
/// Runs after the barcode pipeline as a standalone step; [`Pipeline`](crate::pipeline::Pipeline)
/// never calls it.
pub struct PciProgram {
    config: PciConfig,
}

impl PciProgram {
    pub fn new(config: PciConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, alignment: &Path, output: &Path, uid_list: &Path) -> Command {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(&self.config.script)
            .arg("-i")
            .arg(alignment)
            .arg("-o")
            .arg(output)
            .arg("-s")
            .arg(uid_list);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }

    /// Score every new sample in an aligned set of sequences named by UID
    pub fn score(&self, alignment: &[Sequence], new_uids: &[String]) -> Result<AHashMap<String, f64>> {
        let dir = tempfile::tempdir()?;
        let alignment_path = dir.path().join("alignment.fasta");
        let output_path = dir.path().join("pci_output.txt");
        let uid_path = dir.path().join("new_uids.txt");

        write_fasta(alignment, &alignment_path)?;
        fs::write(&uid_path, format!("{}\n", new_uids.join("\n")))?;

        let mut cmd = self.command(&alignment_path, &output_path, &uid_path);
        info!("   Launching PCI scoring for {} new samples", new_uids.len());
        debug!("   Command: {:?}", cmd);

        let program = self.config.script.display().to_string();
        let output = cmd.output().map_err(|e| ValidatorError::ExternalProcessFailure {
            program: program.clone(),
            exit_code: None,
            stderr: format!("failed to launch: {e}"),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ValidatorError::ExternalProcessFailure {
                program,
                exit_code: output.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("   PCI stderr: {}", stderr);
        }

        let text = fs::read_to_string(&output_path)?;
        let wanted: AHashSet<String> = new_uids.iter().cloned().collect();
        let scores = parse_pci_output(&text, &wanted)?;
        info!("   PCI scored {}/{} new samples", scores.len(), new_uids.len());
        Ok(scores)
    }
}
