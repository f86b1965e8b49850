//! ACE assembly import
//!
//! Reads the `CO`, `AF`, `RD` and `QA` records written by CAP3. Pads (`*`) become
//! [`PAD`] characters. Base qualities are not part of the import; the caller attaches
//! them from the traces it submitted.

use ahash::AHashMap;
use std::path::Path;

use super::{AlignedRead, Contig, PAD};
use crate::core::errors::{Result, ValidatorError};

struct Placement {
    complemented: bool,
    offset: i64,
}

struct ContigBuilder {
    name: String,
    padded_consensus: String,
    placements: AHashMap<String, Placement>,
    reads: Vec<AlignedRead>,
}

impl ContigBuilder {
    fn finish(self) -> Contig {
        Contig {
            name: self.name,
            padded_consensus: self.padded_consensus,
            reads: self.reads,
        }
    }
}

fn parse_error(line_number: usize, message: impl std::fmt::Display) -> ValidatorError {
    ValidatorError::parse("ACE file", format!("line {line_number}: {message}"))
}

fn field<'a>(fields: &[&'a str], index: usize, line_number: usize, what: &str) -> Result<&'a str> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| parse_error(line_number, format!("missing {what}")))
}

fn number<T: std::str::FromStr>(fields: &[&str], index: usize, line_number: usize, what: &str) -> Result<T> {
    let value = field(fields, index, line_number, what)?;
    value
        .parse()
        .map_err(|_| parse_error(line_number, format!("invalid {what} '{value}'")))
}

fn padded(line: &str) -> String {
    line.trim()
        .bytes()
        .map(|b| if b == b'*' { PAD as char } else { b.to_ascii_uppercase() as char })
        .collect()
}

/// Parse ACE text into contigs
pub fn parse_ace(text: &str) -> Result<Vec<Contig>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut contigs = Vec::new();
    let mut current: Option<ContigBuilder> = None;

    // Collect sequence lines following a header up to the next blank line
    let read_block = |start: usize| -> (String, usize) {
        let mut sequence = String::new();
        let mut index = start;
        while index < lines.len() && !lines[index].trim().is_empty() {
            sequence.push_str(&padded(lines[index]));
            index += 1;
        }
        (sequence, index)
    };

    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        let line_number = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields.first().copied() {
            Some("CO") => {
                if let Some(done) = current.take() {
                    contigs.push(done.finish());
                }
                let name = field(&fields, 1, line_number, "contig name")?.to_string();
                let length: usize = number(&fields, 2, line_number, "contig length")?;
                let (padded_consensus, next) = read_block(index + 1);
                if padded_consensus.len() != length {
                    return Err(parse_error(
                        line_number,
                        format!("contig {name} declares {length} bases, found {}", padded_consensus.len()),
                    ));
                }
                current = Some(ContigBuilder {
                    name,
                    padded_consensus,
                    placements: AHashMap::new(),
                    reads: Vec::new(),
                });
                index = next;
                continue;
            }
            Some("AF") => {
                let contig = current
                    .as_mut()
                    .ok_or_else(|| parse_error(line_number, "AF record outside a contig"))?;
                let name = field(&fields, 1, line_number, "read name")?.to_string();
                let complemented = match field(&fields, 2, line_number, "orientation")? {
                    "U" => false,
                    "C" => true,
                    other => return Err(parse_error(line_number, format!("unknown orientation '{other}'"))),
                };
                let start: i64 = number(&fields, 3, line_number, "read start")?;
                contig.placements.insert(
                    name,
                    Placement {
                        complemented,
                        offset: start - 1,
                    },
                );
            }
            Some("RD") => {
                let contig = current
                    .as_mut()
                    .ok_or_else(|| parse_error(line_number, "RD record outside a contig"))?;
                let name = field(&fields, 1, line_number, "read name")?.to_string();
                let length: usize = number(&fields, 2, line_number, "read length")?;
                let (offset, complemented) = contig
                    .placements
                    .get(&name)
                    .map(|p| (p.offset, p.complemented))
                    .ok_or_else(|| parse_error(line_number, format!("read {name} has no AF record")))?;
                let (padded_bases, next) = read_block(index + 1);
                if padded_bases.len() != length {
                    return Err(parse_error(
                        line_number,
                        format!("read {name} declares {length} bases, found {}", padded_bases.len()),
                    ));
                }
                contig.reads.push(AlignedRead {
                    name,
                    offset,
                    padded_bases,
                    quality: None,
                    reverse_complemented: complemented,
                    clip: None,
                });
                index = next;
                continue;
            }
            Some("QA") => {
                let read = current
                    .as_mut()
                    .and_then(|contig| contig.reads.last_mut())
                    .ok_or_else(|| parse_error(line_number, "QA record without a read"))?;
                // Align clipping, falling back to quality clipping
                let start: i64 = number(&fields, 3, line_number, "align clip start")?;
                let end: i64 = number(&fields, 4, line_number, "align clip end")?;
                let (start, end) = if start > 0 && end >= start {
                    (start, end)
                } else {
                    (
                        number(&fields, 1, line_number, "quality clip start")?,
                        number(&fields, 2, line_number, "quality clip end")?,
                    )
                };
                // CAP3 writes -1 when a read is clipped away entirely
                read.clip = if start > 0 && end >= start {
                    Some((start as usize, end as usize))
                } else {
                    Some((1, 0))
                };
            }
            _ => {}
        }
        index += 1;
    }

    if let Some(done) = current.take() {
        contigs.push(done.finish());
    }
    Ok(contigs)
}

pub fn parse_ace_file(path: &Path) -> Result<Vec<Contig>> {
    let text = std::fs::read_to_string(path)?;
    parse_ace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACE: &str = "AS 1 2

CO Contig1 12 2 1 U
ACGT*ACGTACG

BQ
30 30 30 30 30 30 30 30 30 30 30

AF trace_f U 1
AF trace_r C 3
BS 1 12 trace_f

RD trace_f 10 0 0
ACGT*ACGTA

QA 1 10 1 10
DS CHROMAT_FILE: trace_f

RD trace_r 10 0 0
GT*ACG
TACG

QA -1 -1 2 9
DS CHROMAT_FILE: trace_r
";

    #[test]
    fn test_parse_contig() {
        let contigs = parse_ace(ACE).unwrap();
        assert_eq!(contigs.len(), 1);

        let contig = &contigs[0];
        assert_eq!(contig.name, "Contig1");
        assert_eq!(contig.padded_consensus, "ACGT-ACGTACG");
        assert_eq!(contig.read_names(), vec!["trace_f", "trace_r"]);

        let forward = &contig.reads[0];
        assert_eq!(forward.offset, 0);
        assert_eq!(forward.padded_bases, "ACGT-ACGTA");
        assert!(!forward.reverse_complemented);
        assert_eq!(forward.clip, Some((1, 10)));

        let reverse = &contig.reads[1];
        assert_eq!(reverse.offset, 2);
        assert_eq!(reverse.padded_bases, "GT-ACGTACG");
        assert!(reverse.reverse_complemented);
        assert_eq!(reverse.clip, Some((2, 9)));
    }

    #[test]
    fn test_empty_file_has_no_contigs() {
        assert!(parse_ace("AS 0 0\n").unwrap().is_empty());
    }

    #[test]
    fn test_read_without_placement() {
        let text = "CO C1 4 1 1 U\nACGT\n\nRD orphan 4 0 0\nACGT\n";
        assert!(matches!(parse_ace(text), Err(ValidatorError::Parse { .. })));
    }

    #[test]
    fn test_length_mismatch() {
        let text = "CO C1 5 1 1 U\nACGT\n";
        assert!(parse_ace(text).is_err());
    }
}
