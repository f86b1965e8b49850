//! Barcode comparison
//!
//! Aligns a trace or consensus against the user supplied barcode and checks the identity
//! of the aligned region.

use std::sync::Arc;

use crate::alignment::{AlignmentParameters, LocalAligner, MatchRegion};
use crate::core::data_structures::Sequence;
use crate::core::errors::Result;

use super::options::{
    BarcodeComparisonParams, ValidationOptions, ValidationParams, BARCODE_COMPARISON,
};
use super::result::{ColumnValue, ResultFact, NOTES_COLUMN};
use super::SequenceCompareValidation;

pub struct BarcodeComparisonValidation {
    aligner: Arc<dyn LocalAligner>,
    alignment: AlignmentParameters,
}

struct Hit {
    region: MatchRegion,
    score: i32,
    reverse: bool,
}

impl BarcodeComparisonValidation {
    pub fn new(aligner: Arc<dyn LocalAligner>) -> Self {
        Self {
            aligner,
            alignment: AlignmentParameters::default(),
        }
    }

    pub fn with_alignment(mut self, alignment: AlignmentParameters) -> Self {
        self.alignment = alignment;
        self
    }

    fn best_hit(
        &self,
        candidate: &Sequence,
        reference: &Sequence,
        params: &BarcodeComparisonParams,
    ) -> Result<Option<Hit>> {
        let mut orientations = vec![(candidate.bases.clone(), false)];
        if params.allow_reverse_complement {
            orientations.push((candidate.reverse_complement().bases, true));
        }

        let mut best: Option<Hit> = None;
        for (bases, reverse) in orientations {
            let Some(alignment) = self.aligner.align(&bases, &reference.bases, &self.alignment)?
            else {
                continue;
            };
            let Some(region) = alignment.match_region() else {
                continue;
            };
            if best.as_ref().map_or(true, |b| alignment.score > b.score) {
                best = Some(Hit {
                    region,
                    score: alignment.score,
                    reverse,
                });
            }
        }
        Ok(best)
    }
}

impl SequenceCompareValidation for BarcodeComparisonValidation {
    fn identifier(&self) -> &'static str {
        BARCODE_COMPARISON
    }

    fn default_options(&self) -> ValidationOptions {
        ValidationOptions::new(
            BARCODE_COMPARISON,
            "Barcode Comparison",
            "Compares the sequence against the supplied barcode",
            ValidationParams::BarcodeComparison(BarcodeComparisonParams::default()),
        )
    }

    fn validate(
        &self,
        candidate: &Sequence,
        reference: &Sequence,
        options: &ValidationOptions,
    ) -> Result<ResultFact> {
        let params = options.barcode_comparison()?;
        let barcode_link = ColumnValue::Link {
            label: reference.name.clone(),
            target: format!("barcode:{}", reference.name),
        };

        let Some(hit) = self.best_hit(candidate, reference, params)? else {
            return Ok(ResultFact::new(&candidate.name, false)
                .with_column("Identity", ColumnValue::Double(0.0))
                .with_column("Barcode", barcode_link)
                .with_column(
                    NOTES_COLUMN,
                    ColumnValue::Text("No alignment to the barcode".to_string()),
                ));
        };

        let identity = hit.region.identity_percent();
        let passed = identity >= params.min_identity_percent;
        let orientation = if hit.reverse { "reverse" } else { "forward" };

        Ok(ResultFact::new(&candidate.name, passed)
            .with_column("Identity", ColumnValue::Double(identity))
            .with_column("Aligned length", ColumnValue::Int(hit.region.length as i64))
            .with_column("Mismatches", ColumnValue::Int(hit.region.mismatches as i64))
            .with_column("Orientation", ColumnValue::Text(orientation.to_string()))
            .with_column("Barcode", barcode_link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::BioLocalAligner;
    use crate::core::data_structures::reverse_complement;
    use crate::validation::{SingleSequenceValidation, StopCodonValidation};

    const BARCODE: &str = "AACTTTATATTTTATTTTTGGAATTTGAGCAGGAATAGTAGGAACTTCTCTTAGTATTTTA";

    fn validation() -> BarcodeComparisonValidation {
        BarcodeComparisonValidation::new(Arc::new(BioLocalAligner))
    }

    #[test]
    fn test_identical_sequence_passes() {
        let v = validation();
        let fact = v
            .validate(
                &Sequence::new("trace", &BARCODE[5..50]),
                &Sequence::new("barcode", BARCODE),
                &v.default_options(),
            )
            .unwrap();
        assert!(fact.pass());
        assert_eq!(fact.column("Identity"), Some(&ColumnValue::Double(100.0)));
        assert_eq!(
            fact.column("Orientation"),
            Some(&ColumnValue::Text("forward".to_string()))
        );
    }

    #[test]
    fn test_reverse_complement_orientation() {
        let v = validation();
        let candidate = Sequence::new("trace", &reverse_complement(BARCODE));
        let barcode = Sequence::new("barcode", BARCODE);

        let fact = v.validate(&candidate, &barcode, &v.default_options()).unwrap();
        assert!(fact.pass());
        assert_eq!(
            fact.column("Orientation"),
            Some(&ColumnValue::Text("reverse".to_string()))
        );

        let forward_only = ValidationOptions::new(
            BARCODE_COMPARISON,
            "Barcode Comparison",
            "",
            ValidationParams::BarcodeComparison(BarcodeComparisonParams {
                allow_reverse_complement: false,
                ..Default::default()
            }),
        );
        let fact = v.validate(&candidate, &barcode, &forward_only).unwrap();
        assert_ne!(
            fact.column("Orientation"),
            Some(&ColumnValue::Text("reverse".to_string()))
        );
    }

    #[test]
    fn test_identity_threshold() {
        let mut mutated = BARCODE.as_bytes().to_vec();
        for i in [10, 20, 30, 40] {
            mutated[i] = if mutated[i] == b'A' { b'C' } else { b'A' };
        }
        let candidate = Sequence::new("trace", std::str::from_utf8(&mutated).unwrap());
        let barcode = Sequence::new("barcode", BARCODE);
        let v = validation();

        let fact = v.validate(&candidate, &barcode, &v.default_options()).unwrap();
        assert!(!fact.pass());
        assert_eq!(fact.column("Mismatches"), Some(&ColumnValue::Int(4)));
    }

    #[test]
    fn test_wrong_options_rejected() {
        let v = validation();
        let options = StopCodonValidation.default_options();
        let result = v.validate(
            &Sequence::new("a", "ACGT"),
            &Sequence::new("b", "ACGT"),
            &options,
        );
        assert!(result.is_err());
    }
}
