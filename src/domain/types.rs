//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - passed between pipeline stages without conversion
//! - exported to CSV/JSON
//! - reloaded later together with a saved model

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One cleaned input row: a job description and its salary range.
///
/// Ingest guarantees `target_lower <= target_upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub text: String,
    pub target_lower: f64,
    pub target_upper: f64,
}

impl Record {
    pub fn target(&self) -> Interval {
        Interval::new(self.target_lower, self.target_upper)
    }
}

/// A closed 1-D interval `[lo, hi]`.
///
/// Model outputs use the same type but are *not* guaranteed to satisfy `lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Same endpoints, sorted so that `lo <= hi`.
    pub fn normalized(self) -> Self {
        if self.lo <= self.hi {
            self
        } else {
            Self::new(self.hi, self.lo)
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.lo <= self.hi
    }

    pub fn is_finite(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Channel view used by the paired-target loss: index 0 = lower, 1 = upper.
    pub fn channel(&self, idx: usize) -> f64 {
        match idx {
            0 => self.lo,
            _ => self.hi,
        }
    }
}

/// A record after tokenization: fixed-length token ids plus the target pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSample {
    pub token_ids: Vec<u32>,
    pub targets: Interval,
}

/// Elementwise criterion used per channel by the paired-target loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    /// Mean squared error.
    Mse,
    /// Mean absolute error.
    Mae,
}

/// How inverted prediction intervals (`hi < lo`) are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Sort both endpoints before scoring.
    Normalize,
    /// Evaluate the overlap formula on the raw endpoints.
    AsIs,
}

/// Divisor used when averaging per-sample scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivisorMode {
    /// Divide by the number of scored samples.
    SampleCount,
    /// Divide by `N - 1` (the last loop index), reproducing the historical
    /// reference numbers. Undefined for fewer than two samples.
    LastIndex,
}

/// Where tokenization runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Use an accelerator when one is available, otherwise the CPU.
    Auto,
    Cpu,
    Accelerator,
}

/// Gradient boosting hyperparameters (per output channel).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's contribution.
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Rounds without validation improvement before stopping (0 disables).
    pub patience: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            patience: 0,
        }
    }
}

/// Metrics recorded after one boosting round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundMetrics {
    /// 1-based boosting round.
    pub round: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Prediction/target pair for one held-out sample, plus its overlap score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSample {
    pub prediction: Interval,
    pub target: Interval,
    pub score: f64,
}

/// Fully resolved run configuration.
///
/// Built once from CLI arguments and passed by reference to each stage; there is
/// no process-wide seed or device state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    /// Generate this many synthetic records instead of reading `data_path`.
    pub synthetic: Option<usize>,
    pub tokenizer_path: Option<PathBuf>,
    pub max_len: usize,
    pub vocab_size: usize,
    pub batch_size: usize,
    /// Learning rate for gradient-trained regressors. Recorded only; the booster
    /// uses `boost.learning_rate`.
    pub lr: f64,
    pub seed: u64,
    pub test_fraction: f64,
    pub val_fraction: f64,
    /// Booster settings; `n_estimators` comes from `--epochs`, `patience` from `--patience`.
    pub boost: BoostParams,
    pub loss: LossKind,
    pub ordering: OrderingPolicy,
    pub divisor: DivisorMode,
    pub device: Device,
    pub plot: bool,
    pub plot_dir: PathBuf,
    pub use_trained: Option<PathBuf>,
    pub save_model: Option<PathBuf>,
    pub predict: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data/data_cleaned_2021.csv"),
            synthetic: None,
            tokenizer_path: None,
            max_len: 512,
            vocab_size: 30_522,
            batch_size: 10,
            lr: 2e-5,
            seed: 413,
            test_fraction: 0.4,
            val_fraction: 0.0,
            boost: BoostParams::default(),
            loss: LossKind::Mse,
            ordering: OrderingPolicy::Normalize,
            divisor: DivisorMode::SampleCount,
            device: Device::Cpu,
            plot: false,
            plot_dir: PathBuf::from("."),
            use_trained: None,
            save_model: None,
            predict: None,
            export: None,
        }
    }
}
