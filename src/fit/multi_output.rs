//! Two-channel (lower/upper) regressor: one boosted ensemble per channel.
//!
//! Both channels advance one round at a time so the paired loss and the overlap
//! accuracy can be recorded per round, and so early stopping truncates both
//! channels at the same round.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{BoostParams, DivisorMode, EncodedSample, Interval, LossKind, OrderingPolicy, RoundMetrics};
use crate::error::AppError;
use crate::fit::boosting::{BoostingTrainer, GradientBoosting};
use crate::fit::tree::TreeParams;
use crate::math::{aggregate_accuracy, interval_overlap, paired_loss};

/// Feature matrix + targets ready for fitting or scoring.
#[derive(Debug, Clone)]
pub struct FitData {
    pub x: DMatrix<f64>,
    pub y: Vec<Interval>,
}

impl FitData {
    /// Stack encoded samples into an `n × max_len` matrix of token ids.
    pub fn from_samples(samples: &[EncodedSample]) -> Result<Self, AppError> {
        let width = samples.first().map(|s| s.token_ids.len()).unwrap_or(0);
        if let Some(bad) = samples.iter().position(|s| s.token_ids.len() != width) {
            return Err(AppError::numeric(format!(
                "Encoded sample {bad} has {} tokens, expected {width}.",
                samples[bad].token_ids.len()
            )));
        }

        let x = DMatrix::from_fn(samples.len(), width, |i, j| f64::from(samples[i].token_ids[j]));
        let y = samples.iter().map(|s| s.targets).collect();
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// How training progress is scored each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalPolicy {
    pub loss: LossKind,
    pub ordering: OrderingPolicy,
}

/// The fitted two-channel model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputModel {
    pub n_features: usize,
    pub lower: GradientBoosting,
    pub upper: GradientBoosting,
}

/// Fit output: model + per-round history.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub model: MultiOutputModel,
    pub history: Vec<RoundMetrics>,
    /// Round the model was truncated to (equals the rounds run without early stopping).
    pub best_round: usize,
    pub stopped_early: bool,
}

impl MultiOutputModel {
    /// Fit both channels on `train`, optionally monitoring `validation`.
    pub fn fit(
        train: &FitData,
        validation: Option<&FitData>,
        params: &BoostParams,
        eval: EvalPolicy,
    ) -> Result<FitOutcome, AppError> {
        validate_params(params)?;
        if train.is_empty() {
            return Err(AppError::insufficient_data("Training set is empty."));
        }
        let n_features = train.x.ncols();
        let validation = validation.filter(|v| !v.is_empty());
        if let Some(v) = validation {
            if v.x.ncols() != n_features {
                return Err(AppError::numeric(format!(
                    "Validation features have {} columns, training has {n_features}.",
                    v.x.ncols()
                )));
            }
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
        };
        let mut lower = BoostingTrainer::new(train.y.iter().map(|iv| iv.lo).collect(), params.learning_rate, tree_params);
        let mut upper = BoostingTrainer::new(train.y.iter().map(|iv| iv.hi).collect(), params.learning_rate, tree_params);

        // Running validation predictions, updated with each new tree.
        let mut val_pred: Vec<Interval> = validation
            .map(|v| vec![Interval::new(lower.init(), upper.init()); v.len()])
            .unwrap_or_default();

        let mut history = Vec::with_capacity(params.n_estimators);
        let mut best_round = 0usize;
        let mut best_val_loss = f64::INFINITY;
        let mut stopped_early = false;

        for round in 1..=params.n_estimators {
            let lower_tree = lower.step(&train.x);
            if let Some(v) = validation {
                for (row, pred) in val_pred.iter_mut().enumerate() {
                    pred.lo += params.learning_rate * lower_tree.predict_at(&v.x, row);
                }
            }
            let upper_tree = upper.step(&train.x);
            if let Some(v) = validation {
                for (row, pred) in val_pred.iter_mut().enumerate() {
                    pred.hi += params.learning_rate * upper_tree.predict_at(&v.x, row);
                }
            }

            let train_pred: Vec<Interval> = lower
                .fitted()
                .iter()
                .zip(upper.fitted())
                .map(|(&lo, &hi)| Interval::new(lo, hi))
                .collect();
            let train_loss = paired_loss(eval.loss, &train_pred, &train.y);
            let train_accuracy = mean_overlap(&train_pred, &train.y, eval.ordering).unwrap_or(0.0);

            let (val_loss, val_accuracy) = match validation {
                Some(v) => (
                    Some(paired_loss(eval.loss, &val_pred, &v.y)),
                    mean_overlap(&val_pred, &v.y, eval.ordering),
                ),
                None => (None, None),
            };

            tracing::debug!(round, train_loss, train_accuracy, ?val_loss, ?val_accuracy, "boosting round");
            history.push(RoundMetrics {
                round,
                train_loss,
                train_accuracy,
                val_loss,
                val_accuracy,
            });

            match val_loss {
                Some(loss) if loss < best_val_loss => {
                    best_val_loss = loss;
                    best_round = round;
                }
                Some(_) => {
                    if params.patience > 0 && round - best_round >= params.patience {
                        tracing::info!(round, best_round, "early stopping: validation loss stopped improving");
                        stopped_early = true;
                        break;
                    }
                }
                None => best_round = round,
            }
        }

        let mut lower = lower.finish();
        let mut upper = upper.finish();
        if stopped_early {
            lower.truncate(best_round);
            upper.truncate(best_round);
        } else {
            best_round = lower.rounds();
        }

        Ok(FitOutcome {
            model: MultiOutputModel {
                n_features,
                lower,
                upper,
            },
            history,
            best_round,
            stopped_early,
        })
    }

    /// Predict one interval per row of `x`.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<Interval>, AppError> {
        if x.ncols() != self.n_features {
            return Err(AppError::input(format!(
                "Model expects {} features, got {}.",
                self.n_features,
                x.ncols()
            )));
        }
        let out: Vec<Interval> = (0..x.nrows())
            .map(|row| Interval::new(self.lower.predict_at(x, row), self.upper.predict_at(x, row)))
            .collect();
        if out.iter().any(|iv| !iv.is_finite()) {
            return Err(AppError::numeric("Non-finite model prediction."));
        }
        Ok(out)
    }

    /// Predict for a single token-id sequence.
    pub fn predict_tokens(&self, token_ids: &[u32]) -> Result<Interval, AppError> {
        if token_ids.len() != self.n_features {
            return Err(AppError::input(format!(
                "Model expects {} tokens, got {}.",
                self.n_features,
                token_ids.len()
            )));
        }
        let features: Vec<f64> = token_ids.iter().map(|&id| f64::from(id)).collect();
        Ok(Interval::new(
            self.lower.predict_features(&features),
            self.upper.predict_features(&features),
        ))
    }

    pub fn rounds(&self) -> usize {
        self.lower.rounds()
    }
}

fn mean_overlap(predictions: &[Interval], targets: &[Interval], ordering: OrderingPolicy) -> Option<f64> {
    let scores: Vec<f64> = predictions
        .iter()
        .zip(targets)
        .map(|(&p, &t)| interval_overlap(p, t, ordering))
        .collect();
    aggregate_accuracy(&scores, DivisorMode::SampleCount)
}

fn validate_params(params: &BoostParams) -> Result<(), AppError> {
    if params.n_estimators == 0 {
        return Err(AppError::input("Number of boosting rounds must be > 0."));
    }
    if !(params.learning_rate.is_finite() && params.learning_rate > 0.0) {
        return Err(AppError::input("Boosting learning rate must be finite and > 0."));
    }
    if params.min_samples_leaf == 0 {
        return Err(AppError::input("min_samples_leaf must be >= 1."));
    }
    Ok(())
}
