//! Least-squares gradient boosting for one output channel.
//!
//! ```text
//! F_0(x) = mean(y)
//! F_m(x) = F_{m-1}(x) + η · h_m(x),   h_m fit to the residuals y - F_{m-1}(x)
//! ```

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::fit::tree::{RegressionTree, TreeParams};

/// A fitted single-channel ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn predict_at(&self, x: &DMatrix<f64>, row: usize) -> f64 {
        self.init + self.learning_rate * self.trees.iter().map(|t| t.predict_at(x, row)).sum::<f64>()
    }

    pub fn predict_features(&self, features: &[f64]) -> f64 {
        self.init
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|t| t.predict_features(features))
                    .sum::<f64>()
    }

    /// Keep only the first `rounds` trees.
    pub fn truncate(&mut self, rounds: usize) {
        self.trees.truncate(rounds);
    }

    pub fn rounds(&self) -> usize {
        self.trees.len()
    }
}

/// Incremental trainer: holds the current in-sample predictions so each round
/// only fits one tree and updates a vector.
#[derive(Debug, Clone)]
pub struct BoostingTrainer {
    model: GradientBoosting,
    params: TreeParams,
    targets: Vec<f64>,
    fitted: Vec<f64>,
    rows: Vec<usize>,
}

impl BoostingTrainer {
    pub fn new(targets: Vec<f64>, learning_rate: f64, params: TreeParams) -> Self {
        let init = if targets.is_empty() {
            0.0
        } else {
            targets.iter().sum::<f64>() / targets.len() as f64
        };
        let n = targets.len();
        Self {
            model: GradientBoosting {
                init,
                learning_rate,
                trees: Vec::new(),
            },
            params,
            targets,
            fitted: vec![init; n],
            rows: (0..n).collect(),
        }
    }

    /// Fit one more tree on the current residuals and return it.
    pub fn step(&mut self, x: &DMatrix<f64>) -> &RegressionTree {
        let residuals: Vec<f64> = self
            .targets
            .iter()
            .zip(&self.fitted)
            .map(|(y, f)| y - f)
            .collect();
        let tree = RegressionTree::fit(x, &residuals, &self.rows, self.params);
        for (row, fitted) in self.fitted.iter_mut().enumerate() {
            *fitted += self.model.learning_rate * tree.predict_at(x, row);
        }
        self.model.trees.push(tree);
        // Just pushed, so the last element exists.
        &self.model.trees[self.model.trees.len() - 1]
    }

    /// Current in-sample predictions.
    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    pub fn learning_rate(&self) -> f64 {
        self.model.learning_rate
    }

    pub fn init(&self) -> f64 {
        self.model.init
    }

    pub fn finish(self) -> GradientBoosting {
        self.model
    }
}
