//! Marian encoder-decoder inference with ONNX Runtime
//!
//! Expects the split export layout: `encoder_model.onnx`
//! (`input_ids`, `attention_mask` -> `last_hidden_state`) and
//! `decoder_model.onnx` (`encoder_attention_mask`, `input_ids`,
//! `encoder_hidden_states` -> `logits`). Decoding is greedy and batched,
//! re-running the decoder over the full prefix each step.

use anyhow::{Context, Result};
use ndarray::{Array2, ArrayD};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::error::{TranslateError, TranslateResult};
use super::local::Seq2SeqModel;
use super::models::{ModelFile, ModelManager};

/// SentencePiece word boundary marker
const WORD_MARKER: char = '\u{2581}';

/// Longest source sequence fed to the encoder
const MAX_SOURCE_TOKENS: usize = 512;

#[derive(Debug, Deserialize)]
struct MarianConfig {
    pad_token_id: i64,
    eos_token_id: i64,
    #[serde(default)]
    decoder_start_token_id: Option<i64>,
}

/// Ids with special meaning to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: i64,
    pub eos: i64,
    pub unk: i64,
    pub decoder_start: i64,
}

impl SpecialTokens {
    fn contains(&self, id: i64) -> bool {
        id == self.pad || id == self.eos || id == self.unk || id == self.decoder_start
    }
}

/// Piece vocabulary with greedy longest-match segmentation
pub struct Vocabulary {
    token_to_id: HashMap<String, i64>,
    id_to_token: HashMap<i64, String>,
    longest_piece: usize,
}

impl Vocabulary {
    pub fn from_map(token_to_id: HashMap<String, i64>) -> Self {
        let id_to_token = token_to_id.iter().map(|(t, &id)| (id, t.clone())).collect();
        let longest_piece = token_to_id.keys().map(|t| t.chars().count()).max().unwrap_or(1);
        Self {
            token_to_id,
            id_to_token,
            longest_piece,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary {:?}", path))?;
        let map: HashMap<String, i64> = serde_json::from_str(&content).context("Invalid vocabulary JSON")?;
        Ok(Self::from_map(map))
    }

    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn id(&self, token: &str) -> Option<i64> {
        self.token_to_id.get(token).copied()
    }

    /// Split `text` into piece ids and append `eos`
    pub fn encode(&self, text: &str, special: &SpecialTokens) -> Vec<i64> {
        let mut ids = Vec::new();

        for word in text.split_whitespace() {
            let chars: Vec<char> = std::iter::once(WORD_MARKER).chain(word.chars()).collect();
            let mut start = 0;

            while start < chars.len() {
                let limit = chars.len().min(start + self.longest_piece);
                let matched = (start + 1..=limit).rev().find_map(|end| {
                    let piece: String = chars[start..end].iter().collect();
                    self.token_to_id.get(&piece).map(|&id| (id, end))
                });

                match matched {
                    Some((id, end)) => {
                        ids.push(id);
                        start = end;
                    }
                    None => {
                        // A lone marker has no piece of its own in some vocabularies
                        if chars[start] != WORD_MARKER {
                            ids.push(special.unk);
                        }
                        start += 1;
                    }
                }
            }
        }

        ids.push(special.eos);
        ids
    }

    /// Join pieces back into text, dropping special ids
    pub fn decode(&self, ids: &[i64], special: &SpecialTokens) -> String {
        let joined: String = ids
            .iter()
            .filter(|&&id| !special.contains(id))
            .filter_map(|id| self.id_to_token.get(id))
            .map(String::as_str)
            .collect();

        joined.replace(WORD_MARKER, " ").trim().to_string()
    }
}

/// Marian model loaded from ONNX files
pub struct MarianOnnx {
    encoder: Session,
    decoder: Session,
    vocab: Vocabulary,
    special: SpecialTokens,
    max_length: usize,
}

impl MarianOnnx {
    pub fn load(manager: &ModelManager, max_length: usize) -> Result<Self> {
        let config_path = manager.file_path(ModelFile::Config);
        let config: MarianConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {:?}", config_path))?,
        )
        .context("Invalid model config")?;

        let vocab = Vocabulary::from_file(&manager.file_path(ModelFile::Vocabulary))?;
        let special = SpecialTokens {
            pad: config.pad_token_id,
            eos: config.eos_token_id,
            unk: vocab.id("<unk>").unwrap_or(1),
            decoder_start: config.decoder_start_token_id.unwrap_or(config.pad_token_id),
        };
        debug!("Marian special tokens: {:?}, vocabulary size {}", special, vocab.len());

        Ok(Self {
            encoder: build_session(&manager.file_path(ModelFile::Encoder))?,
            decoder: build_session(&manager.file_path(ModelFile::Decoder))?,
            vocab,
            special,
            max_length: max_length.max(1),
        })
    }

    /// Padded `input_ids` and `attention_mask` for a batch
    fn encode_batch(&self, texts: &[String]) -> TranslateResult<(Array2<i64>, Array2<i64>)> {
        let sequences: Vec<Vec<i64>> = texts
            .iter()
            .map(|text| {
                let mut ids = self.vocab.encode(text, &self.special);
                if ids.len() > MAX_SOURCE_TOKENS {
                    ids.truncate(MAX_SOURCE_TOKENS - 1);
                    ids.push(self.special.eos);
                }
                ids
            })
            .collect();

        let width = sequences.iter().map(Vec::len).max().unwrap_or(1);
        let mut input_ids = Vec::with_capacity(texts.len() * width);
        let mut mask = Vec::with_capacity(texts.len() * width);

        for seq in &sequences {
            for i in 0..width {
                match seq.get(i) {
                    Some(&id) => {
                        input_ids.push(id);
                        mask.push(1);
                    }
                    None => {
                        input_ids.push(self.special.pad);
                        mask.push(0);
                    }
                }
            }
        }

        Ok((
            Array2::from_shape_vec((texts.len(), width), input_ids).map_err(shape_error)?,
            Array2::from_shape_vec((texts.len(), width), mask).map_err(shape_error)?,
        ))
    }

    fn run_encoder(&mut self, input_ids: &Array2<i64>, mask: &Array2<i64>) -> TranslateResult<ArrayD<f32>> {
        let outputs = self.encoder.run(ort::inputs![
            "input_ids" => Tensor::from_array(input_ids.clone())?,
            "attention_mask" => Tensor::from_array(mask.clone())?,
        ])?;

        let hidden = outputs
            .get("last_hidden_state")
            .ok_or_else(|| TranslateError::Model("encoder has no last_hidden_state output".to_string()))?
            .try_extract_array::<f32>()?
            .to_owned();
        Ok(hidden)
    }
}

impl Seq2SeqModel for MarianOnnx {
    fn generate(&mut self, texts: &[String]) -> TranslateResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let (input_ids, mask) = self.encode_batch(texts)?;
        let hidden = self.run_encoder(&input_ids, &mask)?;

        let SpecialTokens { pad, eos, decoder_start, .. } = self.special;
        let batch = texts.len();
        let mut sequences: Vec<Vec<i64>> = vec![vec![decoder_start]; batch];
        let mut finished = vec![false; batch];

        for _ in 0..self.max_length {
            let step_len = sequences[0].len();
            let flat: Vec<i64> = sequences.iter().flatten().copied().collect();
            let decoder_ids = Array2::from_shape_vec((batch, step_len), flat).map_err(shape_error)?;

            let outputs = self.decoder.run(ort::inputs![
                "encoder_attention_mask" => Tensor::from_array(mask.clone())?,
                "input_ids" => Tensor::from_array(decoder_ids)?,
                "encoder_hidden_states" => Tensor::from_array(hidden.clone())?,
            ])?;

            let (shape, logits) = outputs
                .get("logits")
                .ok_or_else(|| TranslateError::Model("decoder has no logits output".to_string()))?
                .try_extract_tensor::<f32>()?;

            if shape.len() != 3 {
                return Err(TranslateError::Model(format!("unexpected logits shape {:?}", shape)));
            }
            let vocab_size = shape[2] as usize;

            for (b, seq) in sequences.iter_mut().enumerate() {
                let next = if finished[b] {
                    pad
                } else {
                    let offset = (b * step_len + step_len - 1) * vocab_size;
                    let row = logits
                        .get(offset..offset + vocab_size)
                        .ok_or_else(|| TranslateError::Model("logits shorter than expected".to_string()))?;
                    argmax_excluding(row, pad)
                };
                if next == eos {
                    finished[b] = true;
                }
                seq.push(next);
            }

            if finished.iter().all(|&f| f) {
                break;
            }
        }

        Ok(sequences
            .iter()
            .map(|seq| {
                let generated: Vec<i64> = seq[1..].iter().copied().take_while(|&id| id != eos).collect();
                self.vocab.decode(&generated, &self.special)
            })
            .collect())
    }
}

fn build_session(path: &Path) -> Result<Session> {
    info!("Loading ONNX model from {:?}", path);
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load ONNX model {:?}", path))?;
    Ok(session)
}

/// Index of the highest score, never choosing `banned`
fn argmax_excluding(scores: &[f32], banned: i64) -> i64 {
    scores
        .iter()
        .enumerate()
        .filter(|&(i, _)| i as i64 != banned)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i as i64)
        .unwrap_or(banned)
}

fn shape_error(e: ndarray::ShapeError) -> TranslateError {
    TranslateError::Model(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: SpecialTokens = SpecialTokens {
        pad: 9,
        eos: 0,
        unk: 1,
        decoder_start: 9,
    };

    fn vocab() -> Vocabulary {
        let pieces = [
            ("</s>", 0),
            ("<unk>", 1),
            ("\u{2581}Hello", 2),
            ("\u{2581}wor", 3),
            ("ld", 4),
            ("\u{2581}", 5),
            ("\u{2581}你好", 6),
            ("世界", 7),
            ("<pad>", 9),
        ];
        Vocabulary::from_map(pieces.iter().map(|&(t, id)| (t.to_string(), id)).collect())
    }

    #[test]
    fn test_encode_longest_match() {
        let v = vocab();
        assert_eq!(v.encode("Hello world", &SPECIAL), vec![2, 3, 4, 0]);
    }

    #[test]
    fn test_encode_unknown_chars() {
        let v = vocab();
        // "▁" matches on its own, then "x" and "y" are unknown
        assert_eq!(v.encode("xy", &SPECIAL), vec![5, 1, 1, 0]);
        assert_eq!(v.encode("   ", &SPECIAL), vec![0]);
    }

    #[test]
    fn test_decode_skips_specials() {
        let v = vocab();
        assert_eq!(v.decode(&[9, 6, 7, 0, 9], &SPECIAL), "你好世界");
        assert_eq!(v.decode(&[2, 3, 4], &SPECIAL), "Hello world");
        assert_eq!(v.decode(&[], &SPECIAL), "");
    }

    #[test]
    fn test_argmax_excluding() {
        assert_eq!(argmax_excluding(&[0.1, 0.9, 0.5], 1), 2);
        assert_eq!(argmax_excluding(&[0.1, 0.9, 0.5], 7), 1);
        assert_eq!(argmax_excluding(&[], 3), 3);
    }
}
