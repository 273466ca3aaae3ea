//! Tokenization adapter: `Record` → fixed-length `EncodedSample`.
//!
//! The tokenizer is configured to pad (with its own padding token, or `[PAD]`)
//! and truncate to exactly `max_len` ids. Encoding never fails from the caller's point of
//! view: a text the tokenizer rejects becomes an all-padding sequence.

use std::path::Path;

use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::domain::{EncodedSample, Record};
use crate::error::AppError;
use crate::text::vocab::{PAD_TOKEN, build_word_level};

pub struct TokenEncoder {
    tokenizer: Tokenizer,
    max_len: usize,
    pad_id: u32,
}

impl TokenEncoder {
    /// Load a HuggingFace `tokenizer.json`.
    pub fn from_file(path: &Path, max_len: usize) -> Result<Self, AppError> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| AppError::input(format!("Cannot load tokenizer from '{}': {e}", path.display())))?;
        tracing::info!(path = %path.display(), max_len, "loaded tokenizer");
        Self::from_tokenizer(tokenizer, max_len)
    }

    /// Build a word-level tokenizer from `records` (see `text::vocab`).
    pub fn from_corpus(records: &[Record], vocab_size: usize, max_len: usize) -> Result<Self, AppError> {
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let tokenizer = build_word_level(&texts, vocab_size)?;
        Self::from_tokenizer(tokenizer, max_len)
    }

    /// Restore an encoder from tokenizer JSON saved with a model.
    pub fn from_json(json: &str, max_len: usize) -> Result<Self, AppError> {
        let tokenizer = Tokenizer::from_bytes(json.as_bytes())
            .map_err(|e| AppError::input(format!("Invalid saved tokenizer: {e}")))?;
        Self::from_tokenizer(tokenizer, max_len)
    }

    pub fn from_tokenizer(mut tokenizer: Tokenizer, max_len: usize) -> Result<Self, AppError> {
        if max_len == 0 {
            return Err(AppError::input("Maximum sequence length must be > 0."));
        }

        // Keep a tokenizer file's own padding token; otherwise require `[PAD]`.
        let padding = match tokenizer.get_padding() {
            Some(existing) => PaddingParams {
                strategy: PaddingStrategy::Fixed(max_len),
                ..existing.clone()
            },
            None => {
                let pad_id = tokenizer.token_to_id(PAD_TOKEN).ok_or_else(|| {
                    AppError::input(format!(
                        "Tokenizer has no padding settings and no `{PAD_TOKEN}` token."
                    ))
                })?;
                PaddingParams {
                    strategy: PaddingStrategy::Fixed(max_len),
                    pad_id,
                    pad_token: PAD_TOKEN.to_string(),
                    ..Default::default()
                }
            }
        };
        let pad_id = padding.pad_id;
        tokenizer.with_padding(Some(padding));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_len,
                ..Default::default()
            }))
            .map_err(|e| AppError::input(format!("Invalid truncation settings: {e}")))?;

        Ok(Self {
            tokenizer,
            max_len,
            pad_id,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Serialized tokenizer, for embedding in a model file.
    pub fn to_json(&self) -> Result<String, AppError> {
        self.tokenizer
            .to_string(false)
            .map_err(|e| AppError::numeric(format!("Failed to serialize tokenizer: {e}")))
    }

    /// Encode one text into exactly `max_len` ids.
    pub fn encode_text(&self, text: &str) -> Vec<u32> {
        match self.tokenizer.encode(text, true) {
            Ok(encoding) => self.fit_length(encoding.get_ids().to_vec()),
            Err(e) => {
                tracing::warn!(error = %e, "tokenizer rejected text; using an all-padding sequence");
                vec![self.pad_id; self.max_len]
            }
        }
    }

    pub fn encode_record(&self, record: &Record) -> EncodedSample {
        EncodedSample {
            token_ids: self.encode_text(&record.text),
            targets: record.target(),
        }
    }

    /// Encode records one at a time, in order. `batch_size` only controls how
    /// often progress is logged.
    pub fn encode_all(&self, records: &[Record], batch_size: usize) -> Vec<EncodedSample> {
        let batch_size = batch_size.max(1);
        let mut out = Vec::with_capacity(records.len());
        for (batch_idx, batch) in records.chunks(batch_size).enumerate() {
            out.extend(batch.iter().map(|r| self.encode_record(r)));
            tracing::trace!(batch = batch_idx + 1, encoded = out.len(), total = records.len(), "tokenized batch");
        }
        tracing::info!(records = out.len(), max_len = self.max_len, "tokenization complete");
        out
    }

    /// Pad/truncate to `max_len`. A no-op for encodings the tokenizer already sized;
    /// keeps the invariant when a tokenizer file carries its own post-processing.
    fn fit_length(&self, mut ids: Vec<u32>) -> Vec<u32> {
        ids.resize(self.max_len, self.pad_id);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record {
                text: "senior data engineer london python".to_string(),
                target_lower: 60_000.0,
                target_upper: 80_000.0,
            },
            Record {
                text: "junior nurse leeds".to_string(),
                target_lower: 22_000.0,
                target_upper: 25_000.0,
            },
        ]
    }

    #[test]
    fn short_text_is_padded() {
        let enc = TokenEncoder::from_corpus(&records(), 1000, 16).unwrap();
        let ids = enc.encode_text("junior nurse");
        assert_eq!(ids.len(), 16);
        assert_eq!(ids[0], 101);
        assert_eq!(ids[3], 102);
        assert!(ids[4..].iter().all(|&id| id == enc.pad_id()));
    }

    #[test]
    fn long_text_is_truncated() {
        let enc = TokenEncoder::from_corpus(&records(), 1000, 4).unwrap();
        let ids = enc.encode_text("senior data engineer london python senior data");
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], 101);
        assert_eq!(ids[3], 102);
    }

    #[test]
    fn empty_text_degrades_to_specials_and_padding() {
        let enc = TokenEncoder::from_corpus(&records(), 1000, 8).unwrap();
        let ids = enc.encode_text("");
        assert_eq!(ids.len(), 8);
        assert!(ids[2..].iter().all(|&id| id == 0));
    }

    #[test]
    fn encode_all_preserves_order_and_targets() {
        let recs = records();
        let enc = TokenEncoder::from_corpus(&recs, 1000, 10).unwrap();
        let samples = enc.encode_all(&recs, 1);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].targets.lo, 22_000.0);
        assert_eq!(samples[1].targets.hi, 25_000.0);
        assert_eq!(samples[0], enc.encode_record(&recs[0]));
        assert!(samples.iter().all(|s| s.token_ids.len() == 10));
    }

    #[test]
    fn zero_max_len_is_rejected() {
        assert!(TokenEncoder::from_corpus(&records(), 1000, 0).is_err());
    }

    #[test]
    fn missing_tokenizer_file_is_an_input_error() {
        let err = TokenEncoder::from_file(Path::new("/no/such/tokenizer.json"), 8)
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn saved_json_encodes_identically() {
        let enc = TokenEncoder::from_corpus(&records(), 1000, 12).unwrap();
        let restored = TokenEncoder::from_json(&enc.to_json().unwrap(), 12).unwrap();
        let text = "senior nurse leeds python";
        assert_eq!(restored.encode_text(text), enc.encode_text(text));
        assert_eq!(restored.pad_id(), enc.pad_id());
    }

    #[test]
    fn existing_padding_token_is_kept() {
        let mut tok = crate::text::build_word_level(&["junior nurse"], 100).unwrap();
        tok.with_padding(Some(PaddingParams {
            pad_id: 103,
            pad_token: "[MASK]".to_string(),
            ..Default::default()
        }));
        let enc = TokenEncoder::from_tokenizer(tok, 6).unwrap();
        assert_eq!(enc.pad_id(), 103);
        assert_eq!(enc.encode_text("nurse")[3..], [103, 103, 103]);
    }

    #[test]
    fn tokenizer_without_padding_token_is_rejected() {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": { "<unk>": 0, "hello": 1 }, "unk_token": "<unk>" }
        }"#;
        let err = TokenEncoder::from_json(json, 8).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
