//! The end-to-end run shared by every CLI invocation:
//! ingest -> tokenize -> split -> fit (or load) -> predict -> score.
//!
//! Optional stages (export, model save, plots, single-text prediction) hang off
//! the same run so the binary only has to print the result.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::data::{generate_records, split_dataset};
use crate::domain::{Interval, RoundMetrics, RunConfig, ScoredSample};
use crate::error::AppError;
use crate::fit::{EvalPolicy, FitData, MultiOutputModel};
use crate::io::{IngestedData, ModelFile, TOOL_NAME, load_records, normalize_text, read_model_json, write_model_json};
use crate::math::{aggregate_accuracy, paired_loss, score_predictions};
use crate::plot::{PlotPaths, plot_history};
use crate::text::TokenEncoder;

/// Partition sizes actually used by the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

/// Where the evaluated model came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Fitted in this run.
    Trained {
        history: Vec<RoundMetrics>,
        best_round: usize,
        stopped_early: bool,
    },
    /// Loaded with `--use-trained`.
    Loaded { path: PathBuf, best_round: usize },
}

/// All computed outputs of one run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub split: SplitSizes,
    pub model: MultiOutputModel,
    pub source: ModelSource,
    pub scored: Vec<ScoredSample>,
    pub test_loss: f64,
    pub accuracy: f64,
    /// Range predicted for the `--predict` text, if one was given.
    pub prediction: Option<Interval>,
    pub plots: Option<PlotPaths>,
}

/// Execute the full pipeline for `config`.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingest = load_input(config)?;
    tracing::info!(
        records = ingest.records.len(),
        skipped = ingest.row_errors.len(),
        "loaded dataset"
    );
    for err in &ingest.row_errors {
        tracing::warn!(line = err.line, "skipped row: {}", err.message);
    }

    // A saved model brings its own token mapping; only a fresh fit builds one.
    let trained = match &config.use_trained {
        Some(path) => Some(load_trained(path, config)?),
        None => None,
    };
    let encoder = match &trained {
        Some(file) => encoder_for_model(file, config)?,
        None => build_encoder(config, &ingest)?,
    };
    let samples = encoder.encode_all(&ingest.records, config.batch_size);

    let split = split_dataset(samples, config.test_fraction, config.val_fraction, config.seed)?;
    let sizes = SplitSizes {
        train: split.train.len(),
        validation: split.validation.len(),
        test: split.test.len(),
    };
    if split.test.is_empty() {
        return Err(AppError::insufficient_data(format!(
            "Test split is empty ({} records, test fraction {}).",
            ingest.records.len(),
            config.test_fraction
        )));
    }
    let test = FitData::from_samples(&split.test)?;

    let (model, source) = match (trained, &config.use_trained) {
        (Some(file), Some(path)) => {
            let source = ModelSource::Loaded {
                path: path.clone(),
                best_round: file.best_round,
            };
            (file.model, source)
        }
        _ => {
            let train = FitData::from_samples(&split.train)?;
            let validation = FitData::from_samples(&split.validation)?;
            if config.val_fraction > 0.0 && validation.is_empty() {
                tracing::warn!("validation split is empty; early stopping disabled");
            }
            let eval = EvalPolicy {
                loss: config.loss,
                ordering: config.ordering,
            };
            tracing::info!(
                train = train.len(),
                rounds = config.boost.n_estimators,
                shrinkage = config.boost.learning_rate,
                max_depth = config.boost.max_depth,
                "fitting regressor"
            );
            let outcome = MultiOutputModel::fit(&train, Some(&validation), &config.boost, eval)?;
            if outcome.stopped_early {
                tracing::info!(best_round = outcome.best_round, "stopped early");
            }
            let source = ModelSource::Trained {
                history: outcome.history,
                best_round: outcome.best_round,
                stopped_early: outcome.stopped_early,
            };
            (outcome.model, source)
        }
    };

    let predictions = model.predict(&test.x)?;
    let test_loss = paired_loss(config.loss, &predictions, &test.y);
    let scored = score_predictions(&predictions, &test.y, config.ordering)?;
    let scores: Vec<f64> = scored.iter().map(|s| s.score).collect();
    let accuracy = aggregate_accuracy(&scores, config.divisor).ok_or_else(|| {
        AppError::numeric(format!(
            "Accuracy is undefined for {} test samples with divisor {:?}.",
            scores.len(),
            config.divisor
        ))
    })?;
    tracing::info!(test = scored.len(), test_loss, accuracy, "scored test split");

    if let Some(path) = &config.export {
        crate::io::write_predictions_csv(path, &scored)?;
    }
    if let Some(path) = &config.save_model {
        let file = ModelFile {
            tool: TOOL_NAME.to_string(),
            trained_at: Utc::now(),
            seed: config.seed,
            max_len: config.max_len,
            tokenizer: tokenizer_label(config),
            vocabulary: match config.tokenizer_path {
                Some(_) => None,
                None => Some(encoder.to_json()?),
            },
            vocab_size: config.vocab_size,
            best_round: source.best_round(),
            model: model.clone(),
        };
        write_model_json(path, &file)?;
    }

    let plots = match (&source, config.plot) {
        (ModelSource::Trained { history, .. }, true) => Some(plot_history(history, &config.plot_dir)?),
        (ModelSource::Loaded { .. }, true) => {
            tracing::warn!("no training history for a loaded model; skipping plots");
            None
        }
        (_, false) => None,
    };

    let prediction = match &config.predict {
        Some(path) => Some(predict_file(path, &encoder, &model)?),
        None => None,
    };

    Ok(RunOutput {
        ingest,
        split: sizes,
        model,
        source,
        scored,
        test_loss,
        accuracy,
        prediction,
        plots,
    })
}

impl ModelSource {
    pub fn best_round(&self) -> usize {
        match self {
            Self::Trained { best_round, .. } | Self::Loaded { best_round, .. } => *best_round,
        }
    }
}

fn load_input(config: &RunConfig) -> Result<IngestedData, AppError> {
    match config.synthetic {
        Some(count) => {
            tracing::info!(count, seed = config.seed, "generating synthetic records");
            IngestedData::from_records(generate_records(count, config.seed)?)
        }
        None => load_records(&config.data_path),
    }
}

fn build_encoder(config: &RunConfig, ingest: &IngestedData) -> Result<TokenEncoder, AppError> {
    match &config.tokenizer_path {
        Some(path) => TokenEncoder::from_file(path, config.max_len),
        None => TokenEncoder::from_corpus(&ingest.records, config.vocab_size, config.max_len),
    }
}

fn tokenizer_label(config: &RunConfig) -> Option<String> {
    config.tokenizer_path.as_ref().map(|p| p.display().to_string())
}

/// Load a saved model and check it is usable with this run's settings.
fn load_trained(path: &Path, config: &RunConfig) -> Result<ModelFile, AppError> {
    let file = read_model_json(path)?;
    if file.max_len != config.max_len {
        return Err(AppError::input(format!(
            "Model '{}' was trained with max_len {}, this run uses {}.",
            path.display(),
            file.max_len,
            config.max_len
        )));
    }
    let current = tokenizer_label(config);
    if file.tokenizer != current {
        return Err(AppError::input(format!(
            "Model '{}' was trained with tokenizer {}, this run uses {}.",
            path.display(),
            file.tokenizer.as_deref().unwrap_or("<saved vocabulary>"),
            current.as_deref().unwrap_or("<corpus vocabulary>"),
        )));
    }
    tracing::info!(
        path = %path.display(),
        rounds = file.model.rounds(),
        trained_at = %file.trained_at,
        "loaded trained model"
    );
    Ok(file)
}

/// The encoder a saved model was trained with.
fn encoder_for_model(file: &ModelFile, config: &RunConfig) -> Result<TokenEncoder, AppError> {
    match (&file.vocabulary, &config.tokenizer_path) {
        (Some(json), _) => TokenEncoder::from_json(json, file.max_len),
        (None, Some(path)) => TokenEncoder::from_file(path, file.max_len),
        (None, None) => Err(AppError::input("Saved model carries no tokenizer.")),
    }
}

/// Predict a range for the job description stored in `path`.
fn predict_file(path: &Path, encoder: &TokenEncoder, model: &MultiOutputModel) -> Result<Interval, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::input(format!("Failed to read '{}': {e}", path.display())))?;
    let text = normalize_text(&raw);
    if text.is_empty() {
        return Err(AppError::input(format!("Prediction input '{}' is empty.", path.display())));
    }
    let interval = model.predict_tokens(&encoder.encode_text(&text))?;
    if !interval.is_finite() {
        return Err(AppError::numeric("Non-finite prediction for input text."));
    }
    Ok(interval)
}
