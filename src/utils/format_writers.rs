/// Sequence file formats used at the external program boundary
/// FASTA (plus CAP3 `.qual` companions) for the assembler and scoring program,
/// FASTQ and FASTA readers for trace and barcode input
use bio::io::{fasta, fastq};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::core::data_structures::Sequence;
use crate::core::errors::{Result, ValidatorError};

/// Phred offset of FASTQ quality strings
pub const FASTQ_QUALITY_OFFSET: u8 = 33;

/// FASTA text: `>name description` then the uppercase sequence, without a trailing newline
pub fn fasta_string(sequences: &[Sequence]) -> String {
    let mut text = String::new();
    for sequence in sequences {
        text.push('>');
        text.push_str(&sequence.name);
        if !sequence.description.is_empty() {
            text.push(' ');
            text.push_str(&sequence.description);
        }
        text.push('\n');
        text.push_str(&sequence.bases.to_ascii_uppercase());
        text.push('\n');
    }
    text.trim_end_matches('\n').to_string()
}

/// Write sequences as FASTA
pub fn write_fasta<P: AsRef<Path>>(sequences: &[Sequence], output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(fasta_string(sequences).as_bytes())?;
    writer.flush()?;
    debug!("Wrote {} sequences to FASTA: {}", sequences.len(), path.display());
    Ok(())
}

/// Write space separated qualities in the layout CAP3 reads from `<fasta>.qual`.
/// Returns false and writes nothing unless every sequence has a quality track.
pub fn write_qual<P: AsRef<Path>>(sequences: &[Sequence], output_path: P) -> Result<bool> {
    if sequences.iter().any(|s| !s.has_quality()) {
        return Ok(false);
    }

    let path = output_path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    for sequence in sequences {
        writeln!(writer, ">{}", sequence.name)?;
        let values: Vec<String> = sequence
            .quality
            .iter()
            .flatten()
            .map(|q| q.to_string())
            .collect();
        writeln!(writer, "{}", values.join(" "))?;
    }
    writer.flush()?;
    debug!("Wrote qualities for {} sequences: {}", sequences.len(), path.display());
    Ok(true)
}

fn record_description(desc: Option<&str>) -> String {
    desc.unwrap_or_default().to_string()
}

/// Record bases as text; base calls are ASCII, anything else is a damaged file
fn record_bases(what: &str, id: &str, seq: &[u8]) -> Result<String> {
    match seq.iter().position(|b| !b.is_ascii()) {
        Some(position) => Err(ValidatorError::parse(
            what,
            format!("'{}' has byte 0x{:02X} at position {}", id, seq[position], position + 1),
        )),
        None => Ok(seq.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Read FASTA records from any reader
pub fn read_fasta_from<R: Read>(reader: R) -> Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    for record in fasta::Reader::new(reader).records() {
        let record = record.map_err(|e| ValidatorError::parse("FASTA record", e.to_string()))?;
        let bases = record_bases("FASTA record", record.id(), record.seq())?;
        sequences.push(
            Sequence::new(record.id(), &bases).with_description(record_description(record.desc())),
        );
    }
    Ok(sequences)
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let path = path.as_ref();
    let sequences = read_fasta_from(File::open(path)?)?;
    info!("Read {} sequences from {}", sequences.len(), path.display());
    Ok(sequences)
}

/// Read FASTQ records from any reader, decoding Phred+33 qualities
pub fn read_fastq_from<R: Read>(reader: R) -> Result<Vec<Sequence>> {
    let mut sequences = Vec::new();
    for record in fastq::Reader::new(reader).records() {
        let record = record.map_err(|e| ValidatorError::parse("FASTQ record", e.to_string()))?;
        let bases = record_bases("FASTQ record", record.id(), record.seq())?;
        let quality = record
            .qual()
            .iter()
            .map(|&q| i32::from(q.saturating_sub(FASTQ_QUALITY_OFFSET)))
            .collect();
        sequences.push(
            Sequence::with_quality(record.id(), &bases, quality)?
                .with_description(record_description(record.desc())),
        );
    }
    Ok(sequences)
}

pub fn read_fastq<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let path = path.as_ref();
    let sequences = read_fastq_from(File::open(path)?)?;
    info!("Read {} traces from {}", sequences.len(), path.display());
    Ok(sequences)
}

/// Read traces from FASTQ, or FASTA without qualities, by extension
pub fn read_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    let path = path.as_ref();
    let is_fastq = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "fastq" | "fq"));
    if is_fastq {
        read_fastq(path)
    } else {
        read_fasta(path)
    }
}
