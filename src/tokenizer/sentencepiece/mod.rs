//! SentencePiece-style tokenizers (BPE and Unigram) built from a JSON
//! tokenizer description.
//!
//! Spaces become the `▁` word-boundary marker, added tokens are split out of
//! the raw input first, and characters the vocabulary cannot reach fall back
//! to `<0xNN>` byte tokens (or the unknown token when byte fallback is off).

mod description;
mod unigram;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use super::added::{AddedTokens, Segment};
use super::bpe::{merge_symbols, MergeCache};
use super::vocab::{MergeRanks, Vocabulary};
use super::{EncodedInput, TokenId, Tokenizer, TokenizerError, DEFAULT_MAX_LENGTH};
use crate::telemetry;
use description::{Description, ModelDescription};
use unigram::{Piece, UnigramModel};

/// Word-boundary marker.
pub const WORD_BOUNDARY: char = '\u{2581}';

/// Which segmentation model a [`SentencePiece`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Bpe,
    Unigram,
}

/// When the word-boundary marker is prepended to a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrependScheme {
    /// Every text run between added tokens.
    #[default]
    Always,
    /// Only a run at the very start of the input.
    First,
    Never,
}

/// Configuration for [`SentencePiece`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentencePieceConfig {
    pub bos_token: Option<String>,
    pub eos_token: Option<String>,
    /// Apply NFKC before segmentation.
    pub nfkc: bool,
    pub prepend_scheme: PrependScheme,
    /// Collapse consecutive unknown tokens into one (byte fallback off).
    pub fuse_unk: bool,
    /// Longest Unigram candidate searched, in characters.
    pub max_piece_length: usize,
    pub padding: bool,
    pub max_length: usize,
}

impl Default for SentencePieceConfig {
    fn default() -> Self {
        Self {
            bos_token: None,
            eos_token: None,
            nfkc: false,
            prepend_scheme: PrependScheme::Always,
            fuse_unk: true,
            max_piece_length: 64,
            padding: false,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl SentencePieceConfig {
    pub fn validate(&self) -> Result<(), TokenizerError> {
        if self.max_piece_length == 0 {
            return Err(TokenizerError::InvalidConfig("max_piece_length must be > 0".into()));
        }
        if self.max_length == 0 {
            return Err(TokenizerError::InvalidMaxLength { max_length: 0, minimum: 1 });
        }
        Ok(())
    }
}

enum Model {
    Bpe { ranks: MergeRanks, cache: MergeCache },
    Unigram(UnigramModel),
}

/// SentencePiece BPE or Unigram tokenizer.
pub struct SentencePiece {
    config: SentencePieceConfig,
    model: Model,
    vocab: Vocabulary,
    added: AddedTokens,
    /// Added ids hidden by `decode`.
    special_ids: Vec<TokenId>,
    /// `<0x00>`..`<0xFF>` ids, present only when byte fallback is complete.
    byte_ids: Option<Vec<TokenId>>,
    /// Reverse of `byte_ids` for decode.
    byte_values: HashMap<TokenId, u8>,
    unk_id: Option<TokenId>,
    bos_id: Option<TokenId>,
    eos_id: Option<TokenId>,
}

fn byte_token(byte: u8) -> String {
    format!("<0x{:02X}>", byte)
}

impl SentencePiece {
    /// Parse a `tokenizer.json` description.
    pub fn from_json(json: &str, config: SentencePieceConfig) -> Result<Self, TokenizerError> {
        config.validate()?;
        let description = Description::parse(json)?;

        let (kind, vocab, model_unk, byte_fallback, ranks, scores) = match description.model {
            ModelDescription::Bpe { vocab, merges, unk_token, byte_fallback } => {
                let vocab = Vocabulary::from_map(vocab)?;
                let unk = unk_token.map(|t| vocab.require(&t)).transpose()?;
                let ranks = MergeRanks::from_pairs(merges.into_pairs()?);
                (ModelKind::Bpe, vocab, unk, byte_fallback, Some(ranks), Vec::new())
            }
            ModelDescription::Unigram { vocab: pieces, unk_id, byte_fallback } => {
                let vocab = Vocabulary::from_tokens(pieces.iter().map(|(p, _)| p.as_str()))?;
                let unk = match unk_id {
                    Some(i) if i < pieces.len() => Some(i as TokenId),
                    Some(i) => {
                        return Err(TokenizerError::InvalidDescription(format!(
                            "unk_id {} outside vocabulary of {}",
                            i,
                            pieces.len()
                        )))
                    }
                    None => None,
                };
                (ModelKind::Unigram, vocab, unk, byte_fallback, None, pieces)
            }
        };

        let byte_ids = if byte_fallback {
            let ids: Option<Vec<TokenId>> = (0..=255u8).map(|b| vocab.id(&byte_token(b))).collect();
            if ids.is_none() {
                tracing::warn!("byte_fallback set but <0xNN> tokens incomplete, disabled");
            }
            ids
        } else {
            None
        };
        if byte_ids.is_none() && model_unk.is_none() {
            return Err(TokenizerError::InvalidDescription(
                "model needs an unknown token or complete byte fallback".into(),
            ));
        }

        let byte_values: HashMap<TokenId, u8> = byte_ids
            .iter()
            .flatten()
            .enumerate()
            .map(|(b, &id)| (id, b as u8))
            .collect();

        let lookup = |t: &Option<String>| t.as_deref().map(|t| vocab.require(t)).transpose();
        let bos_id = lookup(&config.bos_token)?;
        let eos_id = lookup(&config.eos_token)?;

        let special_ids = description
            .added_tokens
            .iter()
            .filter(|t| t.special)
            .map(|t| t.id)
            .collect();
        let added = AddedTokens::new(
            description
                .added_tokens
                .into_iter()
                .map(|t| (t.content, t.id)),
        )?;

        let model = match ranks {
            Some(ranks) => Model::Bpe { ranks, cache: MergeCache::default() },
            None => {
                // Control and byte tokens never take part in segmentation.
                let excluded = |id: TokenId| {
                    added.contains_id(id)
                        || Some(id) == model_unk
                        || Some(id) == bos_id
                        || Some(id) == eos_id
                        || byte_values.contains_key(&id)
                };
                let lattice = scores
                    .into_iter()
                    .enumerate()
                    .map(|(i, (piece, score))| (piece, i as TokenId, score))
                    .filter(|(_, id, _)| !excluded(*id));
                Model::Unigram(UnigramModel::new(lattice, config.max_piece_length))
            }
        };

        tracing::info!(
            kind = ?kind,
            vocab = vocab.len(),
            added = added.len(),
            byte_fallback = byte_ids.is_some(),
            "SentencePiece tokenizer ready"
        );

        Ok(Self {
            config,
            model,
            vocab,
            added,
            special_ids,
            byte_ids,
            byte_values,
            unk_id: model_unk,
            bos_id,
            eos_id,
        })
    }

    /// Read a `tokenizer.json` file.
    pub fn from_file(path: &Path, config: SentencePieceConfig) -> Result<Self, TokenizerError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, config)
    }

    pub fn kind(&self) -> ModelKind {
        match self.model {
            Model::Bpe { .. } => ModelKind::Bpe,
            Model::Unigram(_) => ModelKind::Unigram,
        }
    }

    pub fn config(&self) -> &SentencePieceConfig {
        &self.config
    }

    /// Token ids for `text`, without BOS/EOS.
    pub fn tokenize(&self, text: &str) -> Vec<TokenId> {
        let mut ids = Vec::new();
        for (index, segment) in self.added.split(text).into_iter().enumerate() {
            match segment {
                Segment::Added(id) => ids.push(id),
                Segment::Text(run) => {
                    let normalized = self.normalize(run, index == 0);
                    match &self.model {
                        Model::Bpe { ranks, cache } => {
                            self.encode_bpe_segment(&normalized, ranks, cache, &mut ids)
                        }
                        Model::Unigram(model) => {
                            for piece in model.segment(&normalized) {
                                match piece {
                                    Piece::Known(id) => ids.push(id),
                                    Piece::Unknown(start, end) => {
                                        self.push_unknown(&normalized[start..end], &mut ids)
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        ids
    }

    fn normalize(&self, run: &str, at_start: bool) -> String {
        let text: String = if self.config.nfkc {
            run.nfkc().collect()
        } else {
            run.to_string()
        };
        let prepend = match self.config.prepend_scheme {
            PrependScheme::Always => true,
            PrependScheme::First => at_start,
            PrependScheme::Never => false,
        };

        let mut out = String::with_capacity(text.len() + 3);
        if prepend {
            out.push(WORD_BOUNDARY);
        }
        out.extend(text.chars().map(|c| if c == ' ' { WORD_BOUNDARY } else { c }));
        out
    }

    /// Merges run over the whole normalized segment, so pieces may span
    /// several boundary markers (`▁▁`).
    fn encode_bpe_segment(
        &self,
        segment: &str,
        ranks: &MergeRanks,
        cache: &MergeCache,
        ids: &mut Vec<TokenId>,
    ) {
        let merged = cache.get_or_merge(segment, || {
            merge_symbols(segment.chars().map(String::from).collect(), ranks)
        });
        for symbol in merged.iter() {
            match self.vocab.id(symbol) {
                Some(id) => ids.push(id),
                None => self.push_unknown(symbol, ids),
            }
        }
    }

    /// Byte tokens for `text`, or the unknown id (fused with a preceding one).
    fn push_unknown(&self, text: &str, ids: &mut Vec<TokenId>) {
        if let Some(byte_ids) = &self.byte_ids {
            ids.extend(text.bytes().map(|b| byte_ids[b as usize]));
            return;
        }
        if let Some(unk) = self.unk_id {
            if !(self.config.fuse_unk && ids.last() == Some(&unk)) {
                ids.push(unk);
            }
        }
    }

    fn byte_value(&self, id: TokenId) -> Option<u8> {
        self.byte_values.get(&id).copied()
    }
}

impl Tokenizer for SentencePiece {
    fn max_length(&self) -> usize {
        self.config.max_length
    }

    /// Plain right-truncation of the full sequence, sentinels included.
    fn encode_with_length(
        &self,
        text: &str,
        max_length: usize,
    ) -> Result<EncodedInput, TokenizerError> {
        if max_length == 0 {
            return Err(TokenizerError::InvalidMaxLength { max_length, minimum: 1 });
        }

        let content = self.tokenize(text);
        telemetry::record_tokens_encoded("sentencepiece", content.len());

        let mut ids = Vec::with_capacity(content.len() + 2);
        ids.extend(self.bos_id);
        ids.extend(content);
        ids.extend(self.eos_id);
        ids.truncate(max_length);

        let encoded = EncodedInput::single(ids);
        Ok(if self.config.padding { encoded.pad_to(max_length) } else { encoded })
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError> {
        let mut text = String::new();
        let mut bytes = Vec::new();
        for &id in ids {
            if self.special_ids.contains(&id) || Some(id) == self.bos_id || Some(id) == self.eos_id {
                continue;
            }
            if let Some(byte) = self.byte_value(id) {
                bytes.push(byte);
                continue;
            }
            if !bytes.is_empty() {
                text.push_str(&String::from_utf8_lossy(&bytes));
                bytes.clear();
            }
            let surface = self.vocab.token(id).ok_or(TokenizerError::InvalidToken(id))?;
            text.push_str(surface);
        }
        if !bytes.is_empty() {
            text.push_str(&String::from_utf8_lossy(&bytes));
        }

        let text = text.replace(WORD_BOUNDARY, " ");
        Ok(match self.config.prepend_scheme {
            PrependScheme::Never => text,
            _ => text.strip_prefix(' ').map(str::to_string).unwrap_or(text),
        })
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.vocab.id(token)
    }

    fn id_to_token(&self, id: TokenId) -> Option<&str> {
        self.vocab.token(id)
    }
}
