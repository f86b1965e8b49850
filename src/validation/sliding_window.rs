//! Sliding window quality validation
//!
//! Windows of `window_size` bases start every `step_size` bases. A window passes when at
//! least `min_ratio_satisfied` percent of its bases reach `min_quality`. Windows that do
//! not fit entirely before the end of the sequence are not evaluated.

use crate::core::data_structures::{Annotation, Interval, Sequence};
use crate::core::errors::Result;

use super::options::{
    SlidingWindowParams, ValidationOptions, ValidationParams, SLIDING_WINDOW_QUALITY,
};
use super::result::{ColumnValue, ResultFact, NOTES_COLUMN};
use super::SingleSequenceValidation;

/// Annotation name for merged failing windows
pub const LOW_QUALITY_ANNOTATION: &str = "Low quality windows";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlidingWindowReport {
    pub passed: bool,
    pub failed_window_count: usize,
    pub total_window_count: usize,
    /// Merged failing windows, 1-based
    pub failure_intervals: Vec<Interval>,
}

/// Evaluate a quality track
pub fn validate_quality(quality: &[i32], params: &SlidingWindowParams) -> Result<SlidingWindowReport> {
    params.validate()?;

    let window = params.window_size;
    let mut failed = Vec::new();
    let mut total = 0;

    let mut start = 0;
    while start + window <= quality.len() {
        total += 1;
        let satisfied = quality[start..start + window]
            .iter()
            .filter(|&&q| q >= params.min_quality)
            .count();
        let ratio = satisfied as f64 * 100.0 / window as f64;
        if ratio < params.min_ratio_satisfied {
            failed.push(Interval::from_zero_based(start, start + window));
        }
        start += params.step_size;
    }

    Ok(SlidingWindowReport {
        passed: failed.is_empty(),
        failed_window_count: failed.len(),
        total_window_count: total,
        failure_intervals: Interval::merge_all(failed),
    })
}

/// Record failing windows on the sequence; nothing is added when every window passed
pub fn annotate_failures(sequence: &mut Sequence, report: &SlidingWindowReport) {
    if report.failure_intervals.is_empty() {
        return;
    }
    sequence.add_annotation(Annotation::new(
        LOW_QUALITY_ANNOTATION,
        report.failure_intervals.clone(),
    ));
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlidingWindowQualityValidation;

impl SlidingWindowQualityValidation {
    fn report(&self, sequence: &Sequence, options: &ValidationOptions) -> Result<SlidingWindowReport> {
        let params = options.sliding_window()?;
        validate_quality(sequence.require_quality()?, params)
    }

    fn fact(&self, name: &str, report: &SlidingWindowReport, window_size: usize) -> ResultFact {
        let intervals = report
            .failure_intervals
            .iter()
            .map(Interval::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let notes = if report.total_window_count == 0 {
            format!("Sequence shorter than the {window_size} bp window, nothing evaluated")
        } else {
            format!(
                "{} of {} windows below threshold",
                report.failed_window_count, report.total_window_count
            )
        };

        ResultFact::new(name, report.passed)
            .with_column("Failed windows", ColumnValue::Int(report.failed_window_count as i64))
            .with_column("Total windows", ColumnValue::Int(report.total_window_count as i64))
            .with_column("Failure intervals", ColumnValue::Text(intervals))
            .with_column(NOTES_COLUMN, ColumnValue::Text(notes))
    }
}

impl SingleSequenceValidation for SlidingWindowQualityValidation {
    fn identifier(&self) -> &'static str {
        SLIDING_WINDOW_QUALITY
    }

    fn default_options(&self) -> ValidationOptions {
        ValidationOptions::new(
            SLIDING_WINDOW_QUALITY,
            "Trace Quality",
            "Checks that windows along the sequence contain enough high quality bases",
            ValidationParams::SlidingWindowQuality(SlidingWindowParams::default()),
        )
    }

    fn validate(&self, sequence: &Sequence, options: &ValidationOptions) -> Result<ResultFact> {
        let report = self.report(sequence, options)?;
        Ok(self.fact(&sequence.name, &report, options.sliding_window()?.window_size))
    }

    fn annotate(&self, sequence: &mut Sequence, options: &ValidationOptions) -> Result<()> {
        let report = self.report(sequence, options)?;
        annotate_failures(sequence, &report);
        Ok(())
    }

    fn validate_and_annotate(
        &self,
        sequence: &mut Sequence,
        options: &ValidationOptions,
    ) -> Result<ResultFact> {
        let report = self.report(sequence, options)?;
        let fact = self.fact(&sequence.name, &report, options.sliding_window()?.window_size);
        annotate_failures(sequence, &report);
        Ok(fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ValidatorError;
    use proptest::prelude::*;

    fn params(window_size: usize, step_size: usize, min_quality: i32, ratio: f64) -> SlidingWindowParams {
        SlidingWindowParams {
            window_size,
            step_size,
            min_quality,
            min_ratio_satisfied: ratio,
        }
    }

    #[test]
    fn test_ratio_boundary_is_inclusive() {
        let quality = [0, 0, 0, 0, 1];
        assert!(validate_quality(&quality, &params(5, 1, 1, 20.0)).unwrap().passed);
        assert!(validate_quality(&quality, &params(5, 1, 1, 19.9)).unwrap().passed);
        assert!(!validate_quality(&quality, &params(5, 1, 1, 20.1)).unwrap().passed);
    }

    #[test]
    fn test_tail_windows_excluded() {
        let report = validate_quality(&[0, 1, 1, 0, 0], &params(3, 2, 1, 0.0)).unwrap();
        assert_eq!(report.total_window_count, 2);
    }

    #[test]
    fn test_failures_are_merged() {
        let quality = [40, 40, 5, 5, 40, 40, 40, 40];
        let report = validate_quality(&quality, &params(2, 1, 20, 100.0)).unwrap();
        // Windows 2-3, 3-4 and 4-5 fail and merge
        assert_eq!(report.failed_window_count, 3);
        assert_eq!(report.total_window_count, 7);
        assert_eq!(report.failure_intervals, vec![Interval::new(2, 5)]);
    }

    #[test]
    fn test_invalid_steps_rejected() {
        for bad in [params(3, 4, 1, 50.0), params(3, 0, 1, 50.0), params(0, 0, 1, 50.0)] {
            assert!(matches!(
                validate_quality(&[1, 2, 3], &bad),
                Err(ValidatorError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_missing_quality_is_an_error() {
        let validation = SlidingWindowQualityValidation;
        let result = validation.validate(&Sequence::new("trace", "ACGT"), &validation.default_options());
        assert!(matches!(result, Err(ValidatorError::MissingQualityData { .. })));
    }

    #[test]
    fn test_fact_and_annotation() {
        let validation = SlidingWindowQualityValidation;
        let options = ValidationOptions::new(
            SLIDING_WINDOW_QUALITY,
            "Trace Quality",
            "",
            ValidationParams::SlidingWindowQuality(params(2, 2, 20, 100.0)),
        );
        let mut sequence = Sequence::with_quality("trace", "ACGTAC", vec![40, 40, 40, 5, 40, 40]).unwrap();

        let fact = validation.validate(&sequence, &options).unwrap();
        assert!(!fact.pass());
        assert_eq!(fact.column("Failed windows"), Some(&ColumnValue::Int(1)));
        assert_eq!(fact.column("Failure intervals"), Some(&ColumnValue::Text("3-4".to_string())));

        validation.annotate(&mut sequence, &options).unwrap();
        assert_eq!(sequence.annotations[0].name, LOW_QUALITY_ANNOTATION);
        assert_eq!(sequence.annotations[0].intervals, vec![Interval::new(3, 4)]);
    }

    #[test]
    fn test_single_pass_matches_separate_calls() {
        let validation = SlidingWindowQualityValidation;
        let options = ValidationOptions::new(
            SLIDING_WINDOW_QUALITY,
            "Trace Quality",
            "",
            ValidationParams::SlidingWindowQuality(params(2, 2, 20, 100.0)),
        );
        let original = Sequence::with_quality("trace", "ACGTAC", vec![40, 40, 40, 5, 40, 40]).unwrap();

        let mut separate = original.clone();
        let expected = validation.validate(&separate, &options).unwrap();
        validation.annotate(&mut separate, &options).unwrap();

        let mut combined = original;
        let fact = validation.validate_and_annotate(&mut combined, &options).unwrap();
        assert_eq!(fact, expected);
        assert_eq!(combined.annotations, separate.annotations);
        assert_eq!(combined.annotations.len(), 1);
    }

    proptest! {
        #[test]
        fn window_count_matches_formula(
            quality in proptest::collection::vec(0i32..60, 0..200),
            window in 1usize..30,
            step_seed in 0usize..30,
        ) {
            let step = step_seed % window + 1;
            let report = validate_quality(&quality, &params(window, step, 20, 80.0)).unwrap();
            let expected = if quality.len() < window { 0 } else { (quality.len() - window) / step + 1 };
            prop_assert_eq!(report.total_window_count, expected);
            prop_assert!(report.failed_window_count <= report.total_window_count);
            prop_assert_eq!(report.passed, report.failed_window_count == 0);
        }
    }
}
