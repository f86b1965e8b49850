//! Trimming invariants across the quality, criteria and primer trimmers

use proptest::prelude::*;
use std::sync::Arc;

use barcode_validator::alignment::BioLocalAligner;
use barcode_validator::qc::error_probability::confidence_to_error_probability;
use barcode_validator::qc::{
    AmbiguityCriterion, BaseCriteriaTrimmer, ErrorProbabilityTrimmer, PrimerConfig,
    QualityCriterion, QualityTrimMethod, SequenceTrimmer, TrimmingOptions, TrimmingPreset,
};
use barcode_validator::{Sequence, TrimEnds, Trimmage};

fn ends_strategy() -> impl Strategy<Value = TrimEnds> {
    prop_oneof![Just(TrimEnds::Both), Just(TrimEnds::Start), Just(TrimEnds::End)]
}

fn kept_score(qualities: &[i32], trimmage: &Trimmage, limit: f64) -> f64 {
    let to = qualities.len() - trimmage.trim_at_end;
    qualities[trimmage.trim_at_start..to]
        .iter()
        .map(|&q| confidence_to_error_probability(q) - limit)
        .sum()
}

proptest! {
    #[test]
    fn error_probability_trimmage_fits_sequence(
        qualities in prop::collection::vec(0i32..=60, 0..150),
        ends in ends_strategy(),
    ) {
        let trimmer = ErrorProbabilityTrimmer::default();
        let trimmage = trimmer.trim_qualities(&qualities, ends);
        prop_assert!(trimmage.validate_for(qualities.len()).is_ok());

        let discarded = trimmage == Trimmage::discard_all(qualities.len());
        match ends {
            TrimEnds::Start => prop_assert_eq!(trimmage.trim_at_end, 0),
            TrimEnds::End => prop_assert!(trimmage.trim_at_start == 0 || discarded),
            TrimEnds::Both => {}
        }
    }

    #[test]
    fn kept_region_never_scores_above_zero(
        qualities in prop::collection::vec(0i32..=60, 1..150),
    ) {
        let limit = 0.05;
        let trimmage = ErrorProbabilityTrimmer::new(limit).trim_qualities(&qualities, TrimEnds::Both);
        if trimmage.remaining(qualities.len()) > 0 {
            prop_assert!(kept_score(&qualities, &trimmage, limit) <= 1e-9);
        }
    }

    #[test]
    fn criteria_window_is_longest_within_budget(
        qualities in prop::collection::vec(0i32..=40, 1..40),
        allowed in 0usize..3,
    ) {
        let bases = "A".repeat(qualities.len());
        let sequence = Sequence::with_quality("t", &bases, qualities.clone()).unwrap();
        let trimmer = BaseCriteriaTrimmer::default().with_criterion(QualityCriterion::new(20, allowed));
        let trimmage = trimmer.trim(&sequence, TrimEnds::Both);

        let failures = |from: usize, to: usize| qualities[from..to].iter().filter(|&&q| q < 20).count();
        let mut longest = 0;
        for from in 0..qualities.len() {
            for to in from + 1..=qualities.len() {
                if failures(from, to) <= allowed {
                    longest = longest.max(to - from);
                }
            }
        }

        if longest == 0 {
            prop_assert_eq!(trimmage, Trimmage::discard_all(qualities.len()));
        } else {
            let from = trimmage.trim_at_start;
            let to = qualities.len() - trimmage.trim_at_end;
            prop_assert_eq!(to - from, longest);
            prop_assert!(failures(from, to) <= allowed);
        }
    }

    #[test]
    fn trimmed_sequence_length_matches_trimmage(
        qualities in prop::collection::vec(0i32..=60, 0..120),
    ) {
        let bases: String = (0..qualities.len()).map(|i| b"ACGT"[i % 4] as char).collect();
        let sequence = Sequence::with_quality("trace", &bases, qualities).unwrap();
        let options = TrimmingOptions {
            enable_primer_trimming: false,
            ..TrimmingOptions::default()
        };
        let trimmer = SequenceTrimmer::new(options, Arc::new(BioLocalAligner)).unwrap();

        let outcome = trimmer.trim(&sequence).unwrap();
        prop_assert_eq!(outcome.sequence.len(), outcome.trimmage.remaining(sequence.len()));
        prop_assert_eq!(outcome.sequence.quality.as_ref().map(Vec::len), Some(outcome.sequence.len()));
    }
}

#[test]
fn high_quality_trace_is_untouched() {
    let sequence = Sequence::with_quality("trace", "ACGTACGTAC", vec![50; 10]).unwrap();
    let trimmage = ErrorProbabilityTrimmer::default().trim(&sequence, TrimEnds::Both);
    assert_eq!(trimmage, Trimmage::EMPTY);
}

#[test]
fn missing_quality_discards_everything() {
    let sequence = Sequence::new("barcode", "ACGTACGT");
    let trimmage = ErrorProbabilityTrimmer::default().trim(&sequence, TrimEnds::Both);
    assert_eq!(trimmage, Trimmage::discard_all(8));
}

#[test]
fn ambiguity_budget_limits_kept_region() {
    let sequence = Sequence::new("trace", "NNACGTACGTNACGTNN");
    let trimmer = BaseCriteriaTrimmer::default().with_criterion(AmbiguityCriterion::new(0));
    let kept = sequence.trimmed(&trimmer.trim(&sequence, TrimEnds::Both)).unwrap();
    assert_eq!(kept.bases, "ACGTACGT");
}

#[test]
fn primer_then_quality_trimming() {
    let primer = "GGTCAACAAATCATAAAGATATTGG";
    let insert = "ACGTTGCAACGTTGCAACGTTGCAACGTTGCA";
    let bases = format!("{primer}{insert}");
    let mut quality = vec![40; bases.len()];
    let last = quality.len() - 1;
    quality[last] = 2;
    let sequence = Sequence::with_quality("trace", &bases, quality).unwrap();

    let options = TrimmingOptions {
        primer: PrimerConfig {
            primers: vec![primer.to_string()],
            search_reverse_complement: false,
            ..PrimerConfig::default()
        },
        quality_method: QualityTrimMethod::ErrorProbability {
            error_probability_limit: 0.05,
        },
        ..TrimmingOptions::default()
    };
    let trimmer = SequenceTrimmer::new(options, Arc::new(BioLocalAligner)).unwrap();
    let outcome = trimmer.trim(&sequence).unwrap();

    assert_eq!(outcome.primer_trimmage, Trimmage::new(primer.len(), 0));
    assert_eq!(outcome.quality_trimmage, Trimmage::new(0, 1));
    assert_eq!(outcome.trimmage, Trimmage::new(primer.len(), 1));
    assert_eq!(outcome.sequence.bases, &insert[..insert.len() - 1]);
}

#[test]
fn presets_build_valid_options() {
    for preset in [
        TrimmingPreset::Strict,
        TrimmingPreset::Standard,
        TrimmingPreset::Lenient,
        TrimmingPreset::None,
    ] {
        let options: TrimmingOptions = preset.into();
        assert!(options.validate().is_ok(), "{preset} should be valid");
    }
}
