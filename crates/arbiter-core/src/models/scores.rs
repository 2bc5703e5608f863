use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MAX_OUTCOME_SCORE;

/// Agent-reported confidence, clamped to [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Create a new Confidence, clamping to [0.0, 1.0]. NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

/// Normalized outcome value on the 0–100 scale, the common currency for
/// "how good was this decision".
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64")]
pub struct OutcomeScore(f64);

impl OutcomeScore {
    /// Create a new score, clamping to [0.0, 100.0]. NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, MAX_OUTCOME_SCORE))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether this score meets the given success threshold.
    pub fn is_success(self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for OutcomeScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl From<f64> for OutcomeScore {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn deserialized_scores_are_clamped() {
        let c: Confidence = serde_json::from_str("1.7").unwrap();
        assert_eq!(c.value(), 1.0);
        let s: OutcomeScore = serde_json::from_str("140.0").unwrap();
        assert_eq!(s.value(), 100.0);
        let s: OutcomeScore = serde_json::from_str("-3").unwrap();
        assert_eq!(s.value(), 0.0);
    }

    #[test]
    fn confidence_clamps() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn outcome_score_threshold_is_inclusive() {
        assert!(OutcomeScore::new(70.0).is_success(70.0));
        assert!(!OutcomeScore::new(69.9).is_success(70.0));
        assert_eq!(OutcomeScore::new(250.0).value(), 100.0);
    }

    proptest! {
        #[test]
        fn scores_always_land_on_their_scale(raw in proptest::num::f64::ANY) {
            let confidence = Confidence::new(raw).value();
            prop_assert!((0.0..=1.0).contains(&confidence));
            let score = OutcomeScore::new(raw).value();
            prop_assert!((0.0..=MAX_OUTCOME_SCORE).contains(&score));
        }
    }
}
