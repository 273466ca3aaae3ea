//! Read/write model JSON files.
//!
//! A model file is the portable representation of a fitted regressor:
//! - both boosted ensembles (trees as flat node arrays)
//! - the tokenizer needed to encode new text the same way (a file path, or the
//!   corpus-built vocabulary itself)
//! - run metadata (timestamp, seed, rounds)

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::fit::MultiOutputModel;

pub const TOOL_NAME: &str = "salary";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub max_len: usize,
    /// Tokenizer file used for training; `None` means the corpus-built vocabulary.
    pub tokenizer: Option<String>,
    /// Serialized corpus-built tokenizer, present when `tokenizer` is `None`.
    #[serde(default)]
    pub vocabulary: Option<String>,
    pub vocab_size: usize,
    pub best_round: usize,
    pub model: MultiOutputModel,
}

pub fn write_model_json(path: &Path, file: &ModelFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer(out, file).map_err(|e| AppError::input(format!("Failed to write model JSON: {e}")))?;
    tracing::info!(path = %path.display(), rounds = file.model.rounds(), "saved model");
    Ok(())
}

pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let input = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let file: ModelFile =
        serde_json::from_reader(input).map_err(|e| AppError::input(format!("Invalid model JSON: {e}")))?;

    if file.tool != TOOL_NAME {
        return Err(AppError::input(format!(
            "Model JSON was written by '{}', expected '{TOOL_NAME}'.",
            file.tool
        )));
    }
    if file.tokenizer.is_none() && file.vocabulary.is_none() {
        return Err(AppError::input(
            "Model JSON has neither a tokenizer path nor a saved vocabulary.",
        ));
    }
    if file.model.n_features != file.max_len {
        return Err(AppError::input(format!(
            "Model JSON is inconsistent: {} features but max_len {}.",
            file.model.n_features, file.max_len
        )));
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoostParams, EncodedSample, Interval, LossKind, OrderingPolicy};
    use crate::domain::Record;
    use crate::fit::{EvalPolicy, FitData};
    use crate::text::TokenEncoder;

    fn corpus() -> Vec<Record> {
        ["junior nurse", "senior nurse", "lead nurse"]
            .iter()
            .map(|text| Record {
                text: text.to_string(),
                target_lower: 1.0,
                target_upper: 2.0,
            })
            .collect()
    }

    fn trained() -> ModelFile {
        let samples: Vec<EncodedSample> = (0..12)
            .map(|i| EncodedSample {
                token_ids: vec![101, (i % 3) as u32 + 104, 102],
                targets: Interval::new(1_000.0 * (i % 3) as f64, 1_000.0 * (i % 3) as f64 + 500.0),
            })
            .collect();
        let data = FitData::from_samples(&samples).unwrap();
        let params = BoostParams {
            n_estimators: 5,
            ..BoostParams::default()
        };
        let eval = EvalPolicy {
            loss: LossKind::Mse,
            ordering: OrderingPolicy::Normalize,
        };
        let outcome = MultiOutputModel::fit(&data, None, &params, eval).unwrap();
        ModelFile {
            tool: TOOL_NAME.to_string(),
            trained_at: Utc::now(),
            seed: 413,
            max_len: 3,
            tokenizer: None,
            vocabulary: Some(
                TokenEncoder::from_corpus(&corpus(), 100, 3)
                    .unwrap()
                    .to_json()
                    .unwrap(),
            ),
            vocab_size: 100,
            best_round: outcome.best_round,
            model: outcome.model,
        }
    }

    #[test]
    fn saved_model_predicts_like_the_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let original = trained();
        write_model_json(&path, &original).unwrap();
        let loaded = read_model_json(&path).unwrap();

        assert_eq!(loaded.seed, 413);
        assert_eq!(loaded.model.rounds(), 5);
        for tokens in [[101, 104, 102], [101, 106, 102]] {
            let a = original.model.predict_tokens(&tokens).unwrap();
            let b = loaded.model.predict_tokens(&tokens).unwrap();
            assert!((a.lo - b.lo).abs() < 1e-6);
            assert!((a.hi - b.hi).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_foreign_or_inconsistent_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut foreign = trained();
        foreign.tool = "other".to_string();
        write_model_json(&path, &foreign).unwrap();
        assert_eq!(read_model_json(&path).unwrap_err().exit_code(), 2);

        let mut inconsistent = trained();
        inconsistent.max_len = 99;
        write_model_json(&path, &inconsistent).unwrap();
        assert!(read_model_json(&path).is_err());

        let mut no_vocabulary = trained();
        no_vocabulary.vocabulary = None;
        write_model_json(&path, &no_vocabulary).unwrap();
        assert_eq!(read_model_json(&path).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn saved_vocabulary_restores_the_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let original = trained();
        write_model_json(&path, &original).unwrap();
        let loaded = read_model_json(&path).unwrap();

        let before = TokenEncoder::from_corpus(&corpus(), 100, 3).unwrap();
        let after = TokenEncoder::from_json(loaded.vocabulary.as_deref().unwrap(), loaded.max_len).unwrap();
        assert_eq!(after.encode_text("senior nurse"), before.encode_text("senior nurse"));
    }

    #[test]
    fn garbage_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_model_json(&path).unwrap_err().exit_code(), 2);
    }
}
