//! Five-dimensional score algebra for path candidates.
//!
//! Every candidate is scored on five axes, each in `[0.0, 1.0]` with higher
//! always better (latency and cost are normalized so that fast/cheap = 1).
//! The archive's dominance and diversity logic is built entirely on the
//! operations here.

use serde::{Deserialize, Serialize};

/// Axis names, in field order. Used for feedback annotations when the
/// evaluator returns junk on an axis.
pub const AXES: [&str; 5] = [
    "answer_quality",
    "efficiency",
    "cost",
    "robustness",
    "latency",
];

/// A point in the five-dimensional objective space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    /// How well the final answer addresses the query.
    pub answer_quality: f64,
    /// How directly the path reached the answer (fewer wasted turns = higher).
    pub efficiency: f64,
    /// Normalized token cost (cheap = 1).
    pub cost: f64,
    /// Resilience to tool failures and dead ends.
    pub robustness: f64,
    /// Normalized wall-clock latency (fast = 1).
    pub latency: f64,
}

impl ScoreVector {
    /// All-zero vector, used when an evaluation fails outright.
    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    /// Vector with every axis set to `value`.
    pub fn uniform(value: f64) -> Self {
        Self {
            answer_quality: value,
            efficiency: value,
            cost: value,
            robustness: value,
            latency: value,
        }
    }

    /// Components in `AXES` order.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.answer_quality,
            self.efficiency,
            self.cost,
            self.robustness,
            self.latency,
        ]
    }

    /// Pareto dominance: component-wise `>=` with strict `>` on at least one
    /// axis.
    pub fn dominates(&self, other: &Self) -> bool {
        let a = self.as_array();
        let b = other.as_array();
        let mut strictly_better = false;
        for i in 0..a.len() {
            if a[i] < b[i] {
                return false;
            }
            if a[i] > b[i] {
                strictly_better = true;
            }
        }
        strictly_better
    }

    /// Euclidean distance to `other` in objective space.
    pub fn euclidean_distance(&self, other: &Self) -> f64 {
        let a = self.as_array();
        let b = other.as_array();
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    /// Whether every component is finite and within `[0.0, 1.0]`.
    pub fn is_valid(&self) -> bool {
        self.as_array()
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    /// Clamp out-of-range components and map non-finite ones to zero.
    ///
    /// Returns the sanitized vector together with the names of the axes that
    /// were invalid, so the caller can annotate evaluator feedback with
    /// `"invalid axis <name>"`.
    pub fn sanitized(self) -> (Self, Vec<&'static str>) {
        let mut invalid = Vec::new();
        let raw = self.as_array();
        let mut fixed = [0.0f64; 5];
        for (i, v) in raw.iter().enumerate() {
            if !v.is_finite() {
                invalid.push(AXES[i]);
                fixed[i] = 0.0;
            } else if !(0.0..=1.0).contains(v) {
                invalid.push(AXES[i]);
                fixed[i] = v.clamp(0.0, 1.0);
            } else {
                fixed[i] = *v;
            }
        }
        (
            Self {
                answer_quality: fixed[0],
                efficiency: fixed[1],
                cost: fixed[2],
                robustness: fixed[3],
                latency: fixed[4],
            },
            invalid,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominates_strict_on_one_axis() {
        let a = ScoreVector::uniform(0.5);
        let mut b = a;
        b.answer_quality = 0.4;
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn test_equal_vectors_do_not_dominate() {
        let a = ScoreVector::uniform(0.5);
        assert!(!a.dominates(&a));
    }

    #[test]
    fn test_incomparable_vectors() {
        let mut a = ScoreVector::uniform(0.5);
        let mut b = ScoreVector::uniform(0.5);
        a.answer_quality = 0.9;
        b.latency = 0.9;
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn test_euclidean_distance() {
        let a = ScoreVector::zero();
        let b = ScoreVector::uniform(1.0);
        // sqrt(5 * 1^2)
        assert!((a.euclidean_distance(&b) - 5.0_f64.sqrt()).abs() < 1e-12);
        assert!((a.euclidean_distance(&a)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_valid_rejects_out_of_range() {
        let mut v = ScoreVector::uniform(0.5);
        assert!(v.is_valid());
        v.cost = 1.2;
        assert!(!v.is_valid());
        v.cost = f64::NAN;
        assert!(!v.is_valid());
    }

    #[test]
    fn test_sanitized_clamps_and_reports() {
        let v = ScoreVector {
            answer_quality: f64::NAN,
            efficiency: 1.4,
            cost: -0.1,
            robustness: 0.8,
            latency: f64::INFINITY,
        };
        let (fixed, invalid) = v.sanitized();
        assert!(fixed.is_valid());
        assert!((fixed.answer_quality - 0.0).abs() < f64::EPSILON);
        assert!((fixed.efficiency - 1.0).abs() < f64::EPSILON);
        assert!((fixed.cost - 0.0).abs() < f64::EPSILON);
        assert!((fixed.robustness - 0.8).abs() < f64::EPSILON);
        assert!((fixed.latency - 0.0).abs() < f64::EPSILON);
        assert_eq!(
            invalid,
            vec!["answer_quality", "efficiency", "cost", "latency"]
        );
    }

    #[test]
    fn test_sanitized_passthrough_when_valid() {
        let v = ScoreVector::uniform(0.7);
        let (fixed, invalid) = v.sanitized();
        assert_eq!(fixed, v);
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let v = ScoreVector::uniform(0.25);
        let json = serde_json::to_string(&v).unwrap();
        let back: ScoreVector = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
