//! Primer detection and trimming
//!
//! Aligns each primer against the trace with a local aligner and removes the matched
//! region from whichever end it sits closer to.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alignment::{AlignmentParameters, LocalAligner, MatchRegion};
use crate::core::data_structures::{reverse_complement, Sequence};
use crate::core::errors::Result;
use crate::core::trimmage::Trimmage;

/// Primer trimming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimerConfig {
    /// Primer sequences to detect
    pub primers: Vec<String>,

    /// Gap penalties and substitution scores (defaults 12.0 / 3.0)
    pub alignment: AlignmentParameters,

    /// Maximum mismatching columns inside the matched region
    pub max_mismatches: usize,

    /// Minimum matched region length
    pub min_match_length: usize,

    /// Also search the reverse complement of every primer
    pub search_reverse_complement: bool,
}

impl Default for PrimerConfig {
    fn default() -> Self {
        Self {
            primers: Vec::new(),
            alignment: AlignmentParameters::default(),
            max_mismatches: 3,
            min_match_length: 10,
            search_reverse_complement: true,
        }
    }
}

/// Primer hit information
#[derive(Debug, Clone, PartialEq)]
pub struct PrimerMatch {
    pub primer: String,
    pub reverse_complemented: bool,
    pub region: MatchRegion,
    pub trimmage: Trimmage,
}

/// Trim for one primer against raw bases.
///
/// Returns [`Trimmage::EMPTY`] when the match is shorter than `min_match_length` or has
/// more than `max_mismatches` mismatches.
pub fn primer_trimmage(
    aligner: &dyn LocalAligner,
    bases: &str,
    primer: &str,
    parameters: &AlignmentParameters,
    max_mismatches: usize,
    min_match_length: usize,
) -> Result<Trimmage> {
    Ok(find_primer(aligner, bases, primer, parameters, max_mismatches, min_match_length)?
        .map_or(Trimmage::EMPTY, |(_, trimmage)| trimmage))
}

fn find_primer(
    aligner: &dyn LocalAligner,
    bases: &str,
    primer: &str,
    parameters: &AlignmentParameters,
    max_mismatches: usize,
    min_match_length: usize,
) -> Result<Option<(MatchRegion, Trimmage)>> {
    let Some(alignment) = aligner.align(primer, bases, parameters)? else {
        return Ok(None);
    };
    let Some(region) = alignment.match_region() else {
        return Ok(None);
    };
    if region.length < min_match_length || region.mismatches > max_mismatches {
        return Ok(None);
    }

    let length = bases.len();
    let distance_to_start = region.target_from;
    let distance_to_end = length.saturating_sub(region.target_to);
    let trimmage = if distance_to_start <= distance_to_end {
        Trimmage::new(region.target_to.min(length), 0)
    } else {
        Trimmage::new(0, length - region.target_from.min(length))
    };

    Ok(Some((region, trimmage)))
}

/// Primer trimmer over a configured primer set
pub struct PrimerTrimmer {
    config: PrimerConfig,
    aligner: Arc<dyn LocalAligner>,
}

impl PrimerTrimmer {
    pub fn new(config: PrimerConfig, aligner: Arc<dyn LocalAligner>) -> Self {
        Self { config, aligner }
    }

    pub fn config(&self) -> &PrimerConfig {
        &self.config
    }

    /// Detect every configured primer (and reverse complement) in the sequence
    pub fn detect_primers(&self, sequence: &Sequence) -> Result<Vec<PrimerMatch>> {
        let mut matches = Vec::new();
        for primer in &self.config.primers {
            let mut candidates = vec![(primer.to_ascii_uppercase(), false)];
            if self.config.search_reverse_complement {
                candidates.push((reverse_complement(primer), true));
            }

            for (candidate, reverse_complemented) in candidates {
                if let Some((region, trimmage)) = find_primer(
                    self.aligner.as_ref(),
                    &sequence.bases,
                    &candidate,
                    &self.config.alignment,
                    self.config.max_mismatches,
                    self.config.min_match_length,
                )? {
                    matches.push(PrimerMatch {
                        primer: primer.clone(),
                        reverse_complemented,
                        region,
                        trimmage,
                    });
                }
            }
        }
        Ok(matches)
    }

    /// Worst-case trim over all primer hits
    pub fn trim(&self, sequence: &Sequence) -> Result<Trimmage> {
        let trimmage = self
            .detect_primers(sequence)?
            .iter()
            .fold(Trimmage::EMPTY, |acc, hit| acc.max(&hit.trimmage));
        Ok(trimmage.clamped_to(sequence.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{BioLocalAligner, PairwiseAlignment, ScoreMatrix};

    /// Aligner returning a fixed alignment, as documented for `AAAAAAAA` vs `GGAG`
    struct FixedAligner(PairwiseAlignment);

    impl LocalAligner for FixedAligner {
        fn align(
            &self,
            _query: &str,
            _target: &str,
            _parameters: &AlignmentParameters,
        ) -> Result<Option<PairwiseAlignment>> {
            Ok(Some(self.0.clone()))
        }
    }

    fn documented_alignment() -> FixedAligner {
        FixedAligner(PairwiseAlignment {
            aligned_query: "AG".to_string(),
            aligned_target: "AA".to_string(),
            target_start: 0,
            score: 1,
        })
    }

    #[test]
    fn test_documented_primer_trim() {
        let aligner = documented_alignment();
        let params = AlignmentParameters::default();
        let sequence = Sequence::new("s", "AAAAAAAA");

        let trimmage = primer_trimmage(&aligner, &sequence.bases, "GGAG", &params, 3, 2).unwrap();
        assert_eq!(trimmage, Trimmage::new(2, 0));
        assert_eq!(sequence.trimmed(&trimmage).unwrap().bases, "AAAAAA");

        let too_strict = primer_trimmage(&aligner, &sequence.bases, "GGAG", &params, 3, 3).unwrap();
        assert_eq!(too_strict, Trimmage::EMPTY);
    }

    fn parameters(match_score: i32, mismatch_score: i32) -> AlignmentParameters {
        AlignmentParameters {
            gap_open_penalty: 12.0,
            gap_extend_penalty: 3.0,
            scores: ScoreMatrix {
                match_score,
                mismatch_score,
                ambiguous_score: 0,
            },
        }
    }

    #[test]
    fn test_bio_aligner_single_base_match_not_trimmed() {
        // Under 5/-4 the best local alignment of GGAG in a poly-A run is one A/A column
        let params = parameters(5, -4);
        let region = BioLocalAligner
            .align("GGAG", "AAAAAAAA", &params)
            .unwrap()
            .and_then(|alignment| alignment.match_region())
            .unwrap();
        assert_eq!((region.length, region.mismatches), (1, 0));

        let trimmage = primer_trimmage(&BioLocalAligner, "AAAAAAAA", "GGAG", &params, 3, 2).unwrap();
        assert_eq!(trimmage, Trimmage::EMPTY);
        let single = primer_trimmage(&BioLocalAligner, "AAAAAAAA", "GGAG", &params, 3, 1).unwrap();
        assert!(single.trim_at_start == 0 || single.trim_at_end == 0);
        assert!(single.total() >= 1);
    }

    #[test]
    fn test_bio_aligner_permissive_matrix_spans_primer() {
        // A positive mismatch score stretches the match over all four primer bases
        let params = parameters(3, 1);
        let region = BioLocalAligner
            .align("GGAG", "AAAAAAAA", &params)
            .unwrap()
            .and_then(|alignment| alignment.match_region())
            .unwrap();
        assert_eq!((region.length, region.mismatches), (4, 3));

        let trimmage = primer_trimmage(&BioLocalAligner, "AAAAAAAA", "GGAG", &params, 3, 2).unwrap();
        assert!(trimmage.trim_at_start == 0 || trimmage.trim_at_end == 0);
        assert!((4..=6).contains(&trimmage.total()), "{trimmage}");
        let sequence = Sequence::new("s", "AAAAAAAA");
        assert_eq!(sequence.trimmed(&trimmage).unwrap().len(), 8 - trimmage.total());

        // Gated by match length and mismatch count
        for (max_mismatches, min_match_length) in [(3, 5), (2, 2)] {
            let gated = primer_trimmage(
                &BioLocalAligner,
                "AAAAAAAA",
                "GGAG",
                &params,
                max_mismatches,
                min_match_length,
            )
            .unwrap();
            assert_eq!(gated, Trimmage::EMPTY);
        }
    }

    #[test]
    fn test_mismatch_limit() {
        let aligner = documented_alignment();
        let params = AlignmentParameters::default();
        let trimmage = primer_trimmage(&aligner, "AAAAAAAA", "GGAG", &params, 0, 2).unwrap();
        assert_eq!(trimmage, Trimmage::EMPTY);
    }

    #[test]
    fn test_primer_at_start() {
        let primer = "GGTCAACAAATCATAAAGATATTGG";
        let bases = format!("{primer}CCTTTATATTTTATTTTTGGTGCATGAGCTGG");
        let trimmage = primer_trimmage(
            &BioLocalAligner,
            &bases,
            primer,
            &AlignmentParameters::default(),
            2,
            15,
        )
        .unwrap();
        assert_eq!(trimmage, Trimmage::new(primer.len(), 0));
    }

    #[test]
    fn test_reverse_primer_at_end() {
        let reverse_primer = "TAAACTTCAGGGTGACCAAAAAATCA";
        let body = "CCTTTATATTTTATTTTTGGTGCATGAGCTGGAATAGTAGGAACTTC";
        let bases = format!("{body}{}", reverse_complement(reverse_primer));
        let sequence = Sequence::new("trace", &bases);

        let config = PrimerConfig {
            primers: vec![reverse_primer.to_string()],
            max_mismatches: 1,
            min_match_length: 15,
            ..Default::default()
        };
        let trimmer = PrimerTrimmer::new(config, Arc::new(BioLocalAligner));

        let hits = trimmer.detect_primers(&sequence).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].reverse_complemented);
        assert_eq!(trimmer.trim(&sequence).unwrap(), Trimmage::new(0, reverse_primer.len()));
    }

    #[test]
    fn test_no_primers_configured() {
        let trimmer = PrimerTrimmer::new(PrimerConfig::default(), Arc::new(BioLocalAligner));
        let sequence = Sequence::new("trace", "ACGTACGTACGT");
        assert_eq!(trimmer.trim(&sequence).unwrap(), Trimmage::EMPTY);
    }
}
