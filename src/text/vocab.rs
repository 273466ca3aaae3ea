//! Corpus-built word-level tokenizer.
//!
//! Fallback when no pretrained `tokenizer.json` is configured. The generated
//! tokenizer mimics the BERT layout (normalizer, special-token ids,
//! `[CLS] … [SEP]` post-processing) so ids stay in the same ballpark as a real
//! `bert-base-uncased` vocabulary.

use std::collections::HashMap;

use serde_json::json;
use tokenizers::{
    NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

use crate::error::AppError;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";
pub const MASK_TOKEN: &str = "[MASK]";

/// Special tokens and their BERT ids.
const SPECIAL_TOKENS: [(&str, u32); 5] = [
    (PAD_TOKEN, 0),
    (UNK_TOKEN, 100),
    (CLS_TOKEN, 101),
    (SEP_TOKEN, 102),
    (MASK_TOKEN, 103),
];

const FIRST_WORD_ID: u32 = 104;

/// Build a word-level tokenizer over the `vocab_size` most frequent words in `texts`.
///
/// Words are counted after the tokenizer's own normalizer and pre-tokenizer, so
/// every counted word is a piece the finished tokenizer can actually produce.
pub fn build_word_level<S: AsRef<str>>(texts: &[S], vocab_size: usize) -> Result<Tokenizer, AppError> {
    let skeleton = load(&tokenizer_json(&[]))?;
    let words = top_words(&skeleton, texts, vocab_size.saturating_sub(SPECIAL_TOKENS.len()))?;
    let tokenizer = load(&tokenizer_json(&words))?;

    tracing::info!(words = words.len(), "built word-level tokenizer from corpus");
    Ok(tokenizer)
}

fn tokenizer_json(words: &[String]) -> serde_json::Value {
    let mut vocab = serde_json::Map::new();
    for (token, id) in SPECIAL_TOKENS {
        vocab.insert(token.to_string(), json!(id));
    }
    for (offset, word) in words.iter().enumerate() {
        vocab.insert(word.clone(), json!(FIRST_WORD_ID as usize + offset));
    }

    let added_tokens: Vec<_> = SPECIAL_TOKENS
        .iter()
        .map(|(token, id)| {
            json!({
                "id": id,
                "content": token,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": false,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": [SEP_TOKEN, 102],
            "cls": [CLS_TOKEN, 101]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    })
}

fn load(value: &serde_json::Value) -> Result<Tokenizer, AppError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| AppError::numeric(format!("Failed to serialize tokenizer: {e}")))?;
    Tokenizer::from_bytes(bytes).map_err(|e| AppError::numeric(format!("Failed to build word-level tokenizer: {e}")))
}

/// Pieces of `text` as the tokenizer's normalizer and pre-tokenizer split it.
fn pieces(tokenizer: &Tokenizer, text: &str) -> Result<Vec<String>, AppError> {
    let mut normalized = NormalizedString::from(text);
    if let Some(normalizer) = tokenizer.get_normalizer() {
        normalizer
            .normalize(&mut normalized)
            .map_err(|e| AppError::numeric(format!("Normalizer failed: {e}")))?;
    }
    let mut pretokenized = PreTokenizedString::from(normalized);
    if let Some(pre_tokenizer) = tokenizer.get_pre_tokenizer() {
        pre_tokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| AppError::numeric(format!("Pre-tokenizer failed: {e}")))?;
    }
    Ok(pretokenized
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(piece, _, _)| piece.to_string())
        .filter(|piece| !piece.is_empty())
        .collect())
}

/// Most frequent pieces, ties broken alphabetically.
fn top_words<S: AsRef<str>>(tokenizer: &Tokenizer, texts: &[S], limit: usize) -> Result<Vec<String>, AppError> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for piece in pieces(tokenizer, text.as_ref())? {
            *freq.entry(piece).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(limit);
    Ok(words.into_iter().map(|(w, _)| w).collect())
}
