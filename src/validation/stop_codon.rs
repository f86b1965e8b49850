//! Stop codon check
//!
//! Protein coding barcodes such as COI must translate without internal stop codons in
//! their reading frame. Only the standard genetic code is used.

use crate::core::data_structures::Sequence;
use crate::core::errors::{Result, ValidatorError};

use super::options::{StopCodonParams, ValidationOptions, ValidationParams, STOP_CODON};
use super::result::{ColumnValue, ResultFact, NOTES_COLUMN};
use super::SingleSequenceValidation;

fn is_stop_codon(codon: &[u8]) -> bool {
    matches!(codon, b"TAA" | b"TAG" | b"TGA")
}

/// 0-based codon positions of stop codons in a forward frame, ignoring the final codon
pub fn internal_stop_codons(bases: &str, frame: u8) -> Vec<usize> {
    let bytes = bases.as_bytes();
    let offset = usize::from(frame.saturating_sub(1));
    if offset >= bytes.len() {
        return Vec::new();
    }

    let codons: Vec<&[u8]> = bytes[offset..].chunks_exact(3).collect();
    let internal = codons.len().saturating_sub(1);
    codons[..internal]
        .iter()
        .enumerate()
        .filter(|(_, codon)| is_stop_codon(codon))
        .map(|(index, _)| offset + index * 3)
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StopCodonValidation;

impl SingleSequenceValidation for StopCodonValidation {
    fn identifier(&self) -> &'static str {
        STOP_CODON
    }

    fn default_options(&self) -> ValidationOptions {
        ValidationOptions::new(
            STOP_CODON,
            "Stop Codons",
            "Checks for internal stop codons in the forward reading frames",
            ValidationParams::StopCodon(StopCodonParams::default()),
        )
    }

    fn validate(&self, sequence: &Sequence, options: &ValidationOptions) -> Result<ResultFact> {
        let params = options.stop_codon()?;
        let frames: Vec<u8> = match params.reading_frame {
            Some(frame @ 1..=3) => vec![frame],
            Some(frame) => {
                return Err(ValidatorError::invalid_parameter(
                    "reading_frame",
                    frame,
                    "must be 1, 2 or 3",
                ))
            }
            None => vec![1, 2, 3],
        };

        // Frame with the fewest stops, earliest frame on ties
        let (frame, stops) = frames
            .into_iter()
            .map(|frame| (frame, internal_stop_codons(&sequence.bases, frame)))
            .min_by_key(|(frame, stops)| (stops.len(), *frame))
            .unwrap_or((1, Vec::new()));

        let notes = if stops.is_empty() {
            format!("No internal stop codons in frame {frame}")
        } else {
            let positions: Vec<String> = stops.iter().map(|p| (p + 1).to_string()).collect();
            format!("Stop codons in frame {frame} at {}", positions.join(", "))
        };

        Ok(ResultFact::new(&sequence.name, stops.is_empty())
            .with_column("Frame", ColumnValue::Int(i64::from(frame)))
            .with_column("Stop codons", ColumnValue::Int(stops.len() as i64))
            .with_column(NOTES_COLUMN, ColumnValue::Text(notes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(reading_frame: Option<u8>) -> ValidationOptions {
        ValidationOptions::new(
            STOP_CODON,
            "Stop Codons",
            "",
            ValidationParams::StopCodon(StopCodonParams { reading_frame }),
        )
    }

    #[test]
    fn test_internal_stops() {
        // ATG TAA GCC TGA: TAA is internal, the trailing TGA is not
        assert_eq!(internal_stop_codons("ATGTAAGCCTGA", 1), vec![3]);
        assert_eq!(internal_stop_codons("ATGGCCTGA", 1), Vec::<usize>::new());
        assert_eq!(internal_stop_codons("AC", 3), Vec::<usize>::new());
    }

    #[test]
    fn test_fixed_frame() {
        let sequence = Sequence::new("trace", "ATGTAAGCCGCC");
        let fact = StopCodonValidation.validate(&sequence, &options(Some(1))).unwrap();
        assert!(!fact.pass());
        assert_eq!(fact.column("Stop codons"), Some(&ColumnValue::Int(1)));
    }

    #[test]
    fn test_any_frame_passes_when_one_is_clean() {
        // Frame 1 has TAA, frame 2 reads TGT AAG CCG CC
        let sequence = Sequence::new("trace", "ATGTAAGCCGCC");
        let fact = StopCodonValidation.validate(&sequence, &options(None)).unwrap();
        assert!(fact.pass());
        assert_eq!(fact.column("Frame"), Some(&ColumnValue::Int(2)));
    }

    #[test]
    fn test_invalid_frame() {
        let sequence = Sequence::new("trace", "ATG");
        assert!(matches!(
            StopCodonValidation.validate(&sequence, &options(Some(4))),
            Err(ValidatorError::InvalidParameter { .. })
        ));
    }
}
