//! Interval-overlap (IoU) accuracy.
//!
//! For a predicted interval `y` and a true interval `t`:
//!
//! ```text
//! lower = max(y.lo, t.lo)
//! upper = min(y.hi, t.hi)
//! score = (upper - lower) / (max(y.hi, t.hi) - min(y.lo, t.lo))   if lower <= upper
//!       = 0                                                        otherwise
//! ```
//!
//! i.e. the Jaccard index of two 1-D intervals. Rules for the corner cases:
//!
//! - a zero-length union (both intervals are the same point) scores `1`
//! - any non-finite endpoint scores `0`
//! - with `OrderingPolicy::AsIs`, an inverted interval can never satisfy
//!   `lower <= upper`, so it scores `0`

use crate::domain::{DivisorMode, Interval, OrderingPolicy, ScoredSample};
use crate::error::AppError;

/// Overlap score of `prediction` against `target`, in `[0, 1]`.
pub fn interval_overlap(prediction: Interval, target: Interval, ordering: OrderingPolicy) -> f64 {
    if !prediction.is_finite() || !target.is_finite() {
        return 0.0;
    }

    let (y, t) = match ordering {
        OrderingPolicy::Normalize => (prediction.normalized(), target.normalized()),
        OrderingPolicy::AsIs => (prediction, target),
    };

    let lower = y.lo.max(t.lo);
    let upper = y.hi.min(t.hi);
    if lower > upper {
        return 0.0;
    }

    let span = y.hi.max(t.hi) - y.lo.min(t.lo);
    if span > 0.0 {
        ((upper - lower) / span).clamp(0.0, 1.0)
    } else {
        // lower <= upper with an empty union: every endpoint is the same point.
        1.0
    }
}

/// Score each prediction against its target.
pub fn score_predictions(
    predictions: &[Interval],
    targets: &[Interval],
    ordering: OrderingPolicy,
) -> Result<Vec<ScoredSample>, AppError> {
    if predictions.len() != targets.len() {
        return Err(AppError::numeric(format!(
            "Prediction/target count mismatch: {} predictions vs {} targets.",
            predictions.len(),
            targets.len()
        )));
    }

    Ok(predictions
        .iter()
        .zip(targets)
        .map(|(&prediction, &target)| ScoredSample {
            prediction,
            target,
            score: interval_overlap(prediction, target, ordering),
        })
        .collect())
}

/// Mean of per-sample scores.
///
/// Returns `None` when the divisor would be zero (no samples, or a single
/// sample under `DivisorMode::LastIndex`).
pub fn aggregate_accuracy(scores: &[f64], divisor: DivisorMode) -> Option<f64> {
    let denom = match divisor {
        DivisorMode::SampleCount => scores.len(),
        DivisorMode::LastIndex => scores.len().checked_sub(1)?,
    };
    if denom == 0 {
        return None;
    }
    Some(scores.iter().sum::<f64>() / denom as f64)
}
