//! Command-line parsing for the salary range predictor.
//!
//! Parsing stays separate from the pipeline; `app` turns `Cli` into a
//! `RunConfig`.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{Device, LossKind, OrderingPolicy};

/// Environment variable naming a default tokenizer file.
pub const TOKENIZER_ENV: &str = "SALARY_TOKENIZER";

/// Top-level CLI.
#[derive(Debug, Parser, Clone)]
#[command(name = "salary", version, about = "Predict salary ranges from job descriptions")]
pub struct Cli {
    /// Cleaned CSV with `string`, `target_l` and `target_u` columns.
    #[arg(long, default_value = "./data/data_cleaned_2021.csv")]
    pub data_path: PathBuf,

    /// Use N generated records instead of `--data-path`.
    #[arg(long, value_name = "N")]
    pub synthetic: Option<usize>,

    /// HuggingFace `tokenizer.json`; without it a word-level vocabulary is
    /// built from the data.
    #[arg(long, env = TOKENIZER_ENV)]
    pub tokenizer: Option<PathBuf>,

    /// Token sequence length (pad/truncate).
    #[arg(long, default_value_t = 512)]
    pub max_len: usize,

    /// Size cap of the corpus-built vocabulary (special tokens included).
    #[arg(long, default_value_t = 30_522)]
    pub vocab_size: usize,

    /// Records tokenized per progress step.
    #[arg(long, default_value_t = 10)]
    pub batch_size: usize,

    /// Boosting rounds per output channel.
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Learning rate for gradient-trained regressors (recorded; see `--shrinkage`).
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// Random seed for the split shuffle and synthetic data.
    #[arg(long, default_value_t = 413)]
    pub seed: u64,

    /// Rounds without validation improvement before stopping.
    #[arg(long, default_value_t = 10)]
    pub patience: usize,

    /// Saved model JSON to evaluate instead of fitting.
    #[arg(long, value_name = "JSON")]
    pub use_trained: Option<PathBuf>,

    /// Text file with one job description to predict a range for.
    #[arg(long, value_name = "FILE")]
    pub predict: Option<PathBuf>,

    /// Held-out test fraction.
    #[arg(long, default_value_t = 0.4)]
    pub test_fraction: f64,

    /// Validation fraction (enables per-round validation metrics and early stopping).
    #[arg(long, default_value_t = 0.0)]
    pub val_fraction: f64,

    /// Shrinkage applied to every tree.
    #[arg(long, default_value_t = 0.1)]
    pub shrinkage: f64,

    /// Maximum depth of each regression tree.
    #[arg(long, default_value_t = 3)]
    pub max_depth: usize,

    /// Minimum number of samples in a tree leaf.
    #[arg(long, default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Per-channel criterion of the paired loss.
    #[arg(long, value_enum, default_value_t = LossKind::Mse)]
    pub loss: LossKind,

    /// How inverted predicted intervals are scored.
    #[arg(long, value_enum, default_value_t = OrderingPolicy::Normalize)]
    pub ordering: OrderingPolicy,

    /// Average overlap scores over N-1 instead of N.
    #[arg(long)]
    pub legacy_divisor: bool,

    /// Device for tokenization (`auto` resolves to the CPU).
    #[arg(long, value_enum, default_value_t = Device::Auto)]
    pub device: Device,

    /// Write `loss.png` and `accuracy.png`.
    #[arg(long)]
    pub plot: bool,

    /// Directory for the plots.
    #[arg(long, default_value = ".")]
    pub plot_dir: PathBuf,

    /// Save the fitted model as JSON.
    #[arg(long, value_name = "JSON")]
    pub save_model: Option<PathBuf>,

    /// Export per-sample test predictions to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}
