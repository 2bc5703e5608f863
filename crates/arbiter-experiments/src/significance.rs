//! Pooled two-proportion z-test with the simplified significance mapping
//! `1 - exp(-z²/2)`. This is a monotone stand-in for a p-value, not a
//! calibrated one.

use arbiter_core::models::{ArmMetrics, ExperimentWinner};

/// Outcome of evaluating two arms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub z: f64,
    pub significance: f64,
    pub winner: ExperimentWinner,
}

/// z statistic for `test - control`. `None` when either arm has no
/// evaluated decisions or the pooled standard error is zero.
pub fn z_score(control: &ArmMetrics, test: &ArmMetrics) -> Option<f64> {
    if control.evaluated == 0 || test.evaluated == 0 {
        return None;
    }
    let n_control = control.evaluated as f64;
    let n_test = test.evaluated as f64;
    let pooled = (control.successes + test.successes) as f64 / (n_control + n_test);
    let standard_error = (pooled * (1.0 - pooled) * (1.0 / n_control + 1.0 / n_test)).sqrt();
    if !standard_error.is_finite() || standard_error <= f64::EPSILON {
        return None;
    }
    Some((test.success_rate - control.success_rate) / standard_error)
}

pub fn significance_from_z(z: f64) -> f64 {
    1.0 - (-(z * z) / 2.0).exp()
}

/// Significance and winner. Below `threshold`, or with no usable data, the
/// result is inconclusive.
pub fn evaluate(control: &ArmMetrics, test: &ArmMetrics, threshold: f64) -> Verdict {
    let Some(z) = z_score(control, test) else {
        return Verdict {
            z: 0.0,
            significance: 0.0,
            winner: ExperimentWinner::Inconclusive,
        };
    };
    let significance = significance_from_z(z);
    let winner = if significance < threshold {
        ExperimentWinner::Inconclusive
    } else if test.success_rate > control.success_rate {
        ExperimentWinner::Test
    } else if control.success_rate > test.success_rate {
        ExperimentWinner::Control
    } else {
        ExperimentWinner::Inconclusive
    };
    Verdict {
        z,
        significance,
        winner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arm(evaluated: u64, successes: u64) -> ArmMetrics {
        ArmMetrics::from_counts(evaluated, evaluated, successes)
    }

    #[test]
    fn clear_improvement_is_significant() {
        let verdict = evaluate(&arm(200, 80), &arm(200, 140), 0.95);
        assert!(verdict.significance >= 0.95, "{verdict:?}");
        assert_eq!(verdict.winner, ExperimentWinner::Test);
        assert!(verdict.z > 0.0);
    }

    #[test]
    fn no_evaluated_decisions_is_inconclusive() {
        let verdict = evaluate(&arm(0, 0), &arm(10, 9), 0.95);
        assert_eq!(verdict.significance, 0.0);
        assert_eq!(verdict.winner, ExperimentWinner::Inconclusive);
    }

    #[test]
    fn zero_variance_is_inconclusive() {
        let verdict = evaluate(&arm(25, 0), &arm(40, 0), 0.95);
        assert_eq!(verdict.significance, 0.0);
        assert_eq!(verdict.winner, ExperimentWinner::Inconclusive);
    }

    #[test]
    fn mapping_is_monotone_in_abs_z() {
        assert_eq!(significance_from_z(0.0), 0.0);
        assert!(significance_from_z(1.0) < significance_from_z(2.0));
        assert_eq!(significance_from_z(-2.0), significance_from_z(2.0));
    }

    proptest! {
        #[test]
        fn identical_rates_never_win(
            n in 1u64..500,
            k_frac in 0.0f64..=1.0,
            scale in 1u64..5,
        ) {
            let k = ((n as f64) * k_frac).floor() as u64;
            let control = arm(n, k);
            let test = arm(n * scale, k * scale);
            let verdict = evaluate(&control, &test, 0.95);
            prop_assert!(verdict.significance < 0.95);
            prop_assert_eq!(verdict.winner, ExperimentWinner::Inconclusive);
        }

        #[test]
        fn significance_stays_in_unit_interval(
            nc in 1u64..300, kc_frac in 0.0f64..=1.0,
            nt in 1u64..300, kt_frac in 0.0f64..=1.0,
        ) {
            let control = arm(nc, ((nc as f64) * kc_frac).floor() as u64);
            let test = arm(nt, ((nt as f64) * kt_frac).floor() as u64);
            let verdict = evaluate(&control, &test, 0.95);
            prop_assert!((0.0..=1.0).contains(&verdict.significance));
        }
    }
}
