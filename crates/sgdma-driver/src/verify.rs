//! Verification engine.
//!
//! Compares observed destination data against an independently computed
//! expectation. The tolerance is 0 for straight copies and 1 for the
//! arithmetic pipeline: the RTL divides by 400 with a fixed-point
//! reciprocal, and its result can differ from software integer division by
//! one. Example recording is bounded so a systematically wrong transfer
//! does not produce 256 lines of output; counting is not.

use sgdma_chip::regs::STREAM_DIVISOR;

/// Most mismatch examples recorded in one report. The count keeps going
/// past this bound.
pub const MAX_RECORDED_MISMATCHES: usize = 10;

/// What the destination should hold per source word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Straight copy: `dest[i] == src[i]`.
    Identity,
    /// Multdiv pipeline: `dest[i] == src[i] * coefficient / 400`.
    MultDiv {
        /// Coefficient numerator programmed into the unit.
        coefficient: i32,
    },
}

impl Expectation {
    /// Expected destination value for one input word.
    pub fn apply(&self, input: i32) -> i32 {
        match self {
            Self::Identity => input,
            Self::MultDiv { coefficient } => {
                // i64 intermediate: input * coeff overflows i32 for the
                // larger test patterns.
                #[allow(clippy::cast_possible_truncation)]
                let out =
                    (i64::from(input) * i64::from(*coefficient) / i64::from(STREAM_DIVISOR)) as i32;
                out
            }
        }
    }
}

/// One recorded mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Buffer index.
    pub index: usize,
    /// Source word the expectation was computed from.
    pub input: i32,
    /// Expected destination value.
    pub expected: i32,
    /// Observed destination value.
    pub actual: i32,
}

/// Outcome of one verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationReport {
    /// Total words outside tolerance. Counts past the recording bound.
    pub mismatch_count: usize,
    /// Up to [`MAX_RECORDED_MISMATCHES`] example mismatches.
    pub examples: Vec<Mismatch>,
}

impl VerificationReport {
    /// Whether every word was within tolerance.
    pub fn passed(&self) -> bool {
        self.mismatch_count == 0
    }
}

/// Compare `actual` against `expectation` applied to `source`, word by
/// word, allowing `tolerance` of absolute difference.
///
/// Pure over its inputs: running it twice over unchanged buffers yields an
/// identical report.
///
/// # Panics
///
/// Panics if `actual` and `source` differ in length; the harness always
/// verifies full same-sized buffers.
pub fn verify(
    actual: &[i32],
    source: &[i32],
    expectation: Expectation,
    tolerance: i32,
) -> VerificationReport {
    assert_eq!(actual.len(), source.len(), "buffer length mismatch");

    let mut report = VerificationReport::default();
    for (index, (&a, &s)) in actual.iter().zip(source).enumerate() {
        let expected = expectation.apply(s);
        if (a - expected).abs() > tolerance {
            if report.examples.len() < MAX_RECORDED_MISMATCHES {
                report.examples.push(Mismatch {
                    index,
                    input: s,
                    expected,
                    actual: a,
                });
            }
            report.mismatch_count += 1;
        }
    }

    if report.mismatch_count > 0 {
        tracing::warn!(
            "verification: {} mismatches ({} recorded)",
            report.mismatch_count,
            report.examples.len()
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_exact_match_passes() {
        let src: Vec<i32> = (0..256).map(|i| 400 + i).collect();
        let report = verify(&src, &src, Expectation::Identity, 0);
        assert!(report.passed());
        assert!(report.examples.is_empty());
    }

    #[test]
    fn multdiv_within_tolerance_passes() {
        let src: Vec<i32> = (0..256).map(|i| i * 400).collect();
        // Hardware result off by one from ideal division at every word.
        let actual: Vec<i32> = src.iter().map(|&v| v * 800 / 400 + 1).collect();
        let report = verify(&actual, &src, Expectation::MultDiv { coefficient: 800 }, 1);
        assert!(report.passed());
    }

    #[test]
    fn off_by_two_fails_with_tolerance_one() {
        let src = vec![400; 8];
        let actual = vec![402; 8];
        let report = verify(&actual, &src, Expectation::Identity, 1);
        assert_eq!(report.mismatch_count, 8);
        assert_eq!(report.examples[0].expected, 400);
        assert_eq!(report.examples[0].actual, 402);
    }

    #[test]
    fn example_recording_caps_but_count_continues() {
        let src = vec![0; 256];
        let actual = vec![99; 256];
        let report = verify(&actual, &src, Expectation::Identity, 0);
        assert_eq!(report.mismatch_count, 256);
        assert_eq!(report.examples.len(), MAX_RECORDED_MISMATCHES);
    }

    #[test]
    fn verify_is_idempotent() {
        let src: Vec<i32> = (0..256).collect();
        let actual: Vec<i32> = (0..256).map(|i| i + (i % 7 == 0) as i32 * 3).collect();
        let first = verify(&actual, &src, Expectation::Identity, 0);
        let second = verify(&actual, &src, Expectation::Identity, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn multdiv_uses_wide_intermediate() {
        // 102_000 * 800 overflows i32; the expectation must not.
        let e = Expectation::MultDiv { coefficient: 800 };
        assert_eq!(e.apply(102_000), 204_000);
    }
}
