//! Byte-level BPE (CLIP / GPT-2 family) and the shared merge loop.
//!
//! Text is normalized, split into word-like chunks by a regex, and every
//! chunk is merged symbol-by-symbol using the merge-rank table until no
//! ranked adjacent pair remains.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use serde::Deserialize;

use super::added::{AddedTokens, Segment};
use super::byte_level::ByteLevelTable;
use super::vocab::{MergeRanks, Vocabulary};
use super::{EncodedInput, TokenId, Tokenizer, TokenizerError, DEFAULT_MAX_LENGTH};
use crate::telemetry;

/// CLIP chunking pattern: contractions, letter runs, single digits, symbol runs.
pub const CLIP_PATTERN: &str =
    r"<\|startoftext\|>|<\|endoftext\|>|'s|'t|'re|'ve|'m|'ll|'d|[\p{L}]+|[\p{N}]|[^\s\p{L}\p{N}]+";

/// GPT-2 chunking pattern without the trailing-whitespace lookahead, which
/// the `regex` crate does not support; runs of whitespace form their own chunk.
pub const GPT2_PATTERN: &str = r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+";

/// Entries kept in a merge cache before it is cleared.
const MERGE_CACHE_CAPACITY: usize = 16_384;

/// Apply the lowest-rank merge repeatedly until no ranked pair remains.
///
/// The leftmost pair wins when two pairs share a rank.
pub(crate) fn merge_symbols(mut symbols: Vec<String>, ranks: &MergeRanks) -> Vec<String> {
    while symbols.len() > 1 {
        let mut best: Option<(usize, usize)> = None;
        for i in 0..symbols.len() - 1 {
            if let Some(rank) = ranks.rank(&symbols[i], &symbols[i + 1]) {
                if best.map_or(true, |(best_rank, _)| rank < best_rank) {
                    best = Some((rank, i));
                }
            }
        }

        let Some((_, i)) = best else { break };
        let right = symbols.remove(i + 1);
        symbols[i].push_str(&right);
    }
    symbols
}

/// Bounded memo of chunk -> merged symbols.
#[derive(Debug, Default)]
pub(crate) struct MergeCache {
    entries: Mutex<HashMap<String, Arc<[String]>>>,
}

impl MergeCache {
    pub(crate) fn get_or_merge<F>(&self, key: &str, merge: F) -> Arc<[String]>
    where
        F: FnOnce() -> Vec<String>,
    {
        if let Some(hit) = self.entries.lock().get(key) {
            return Arc::clone(hit);
        }

        let merged: Arc<[String]> = merge().into();
        let mut entries = self.entries.lock();
        if entries.len() >= MERGE_CACHE_CAPACITY {
            entries.clear();
        }
        entries.insert(key.to_string(), Arc::clone(&merged));
        merged
    }
}

/// Configuration for [`ByteLevelBpe`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BpeConfig {
    /// Lowercase before chunking.
    pub lowercase: bool,
    /// Trim and collapse whitespace runs to a single space before chunking.
    pub collapse_whitespace: bool,
    /// Marker appended to the last symbol of every chunk (CLIP uses `</w>`).
    pub end_of_word_suffix: Option<String>,
    /// Chunking regex.
    pub pattern: String,
    /// Map chunk bytes through the GPT-2 byte table before merging.
    pub byte_level: bool,
    pub bos_token: Option<String>,
    pub eos_token: Option<String>,
    /// Emitted for symbols missing from the vocabulary; dropped when `None`.
    pub unk_token: Option<String>,
    /// Right-pad to the requested length.
    pub padding: bool,
    /// Length used by [`Tokenizer::encode`].
    pub max_length: usize,
}

impl Default for BpeConfig {
    fn default() -> Self {
        Self::gpt2()
    }
}

impl BpeConfig {
    /// GPT-2 defaults: case preserved, no markers, no padding.
    pub fn gpt2() -> Self {
        Self {
            lowercase: false,
            collapse_whitespace: false,
            end_of_word_suffix: None,
            pattern: GPT2_PATTERN.to_string(),
            byte_level: true,
            bos_token: None,
            eos_token: None,
            unk_token: None,
            padding: false,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// CLIP text-encoder defaults: 77-token context padded with zeros.
    pub fn clip() -> Self {
        Self {
            lowercase: true,
            collapse_whitespace: true,
            end_of_word_suffix: Some("</w>".to_string()),
            pattern: CLIP_PATTERN.to_string(),
            byte_level: true,
            bos_token: Some("<|startoftext|>".to_string()),
            eos_token: Some("<|endoftext|>".to_string()),
            unk_token: Some("<|endoftext|>".to_string()),
            padding: true,
            max_length: 77,
        }
    }

    /// Number of positions taken by BOS/EOS.
    fn reserved(&self) -> usize {
        usize::from(self.bos_token.is_some()) + usize::from(self.eos_token.is_some())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), TokenizerError> {
        if self.pattern.is_empty() {
            return Err(TokenizerError::InvalidConfig("pattern cannot be empty".into()));
        }
        if matches!(&self.end_of_word_suffix, Some(s) if s.is_empty()) {
            return Err(TokenizerError::InvalidConfig(
                "end_of_word_suffix cannot be empty".into(),
            ));
        }
        if self.max_length <= self.reserved() {
            return Err(TokenizerError::InvalidMaxLength {
                max_length: self.max_length,
                minimum: self.reserved() + 1,
            });
        }
        Ok(())
    }
}

/// Byte-level BPE tokenizer.
pub struct ByteLevelBpe {
    config: BpeConfig,
    vocab: Vocabulary,
    ranks: MergeRanks,
    pattern: Regex,
    bytes: ByteLevelTable,
    specials: AddedTokens,
    bos_id: Option<TokenId>,
    eos_id: Option<TokenId>,
    unk_id: Option<TokenId>,
    cache: MergeCache,
}

impl ByteLevelBpe {
    /// Build from an id map and merge ranks. BOS, EOS and UNK strings must be
    /// present in the vocabulary when configured.
    pub fn new(
        vocab: Vocabulary,
        ranks: MergeRanks,
        config: BpeConfig,
    ) -> Result<Self, TokenizerError> {
        config.validate()?;

        let pattern = Regex::new(&config.pattern)
            .map_err(|e| TokenizerError::InvalidPattern(e.to_string()))?;
        let lookup = |t: &Option<String>| t.as_deref().map(|t| vocab.require(t)).transpose();
        let bos_id = lookup(&config.bos_token)?;
        let eos_id = lookup(&config.eos_token)?;
        let unk_id = lookup(&config.unk_token)?;

        let specials = AddedTokens::new(
            [(&config.bos_token, bos_id), (&config.eos_token, eos_id)]
                .into_iter()
                .filter_map(|(t, id)| Some((t.clone()?, id?))),
        )?;

        tracing::info!(
            vocab = vocab.len(),
            merges = ranks.len(),
            byte_level = config.byte_level,
            "byte-level BPE tokenizer ready"
        );

        Ok(Self {
            config,
            vocab,
            ranks,
            pattern,
            bytes: ByteLevelTable::new(),
            specials,
            bos_id,
            eos_id,
            unk_id,
            cache: MergeCache::default(),
        })
    }

    /// Build from `vocab.json` content and `merges.txt` content.
    pub fn from_strs(
        vocab_json: &str,
        merges_txt: &str,
        config: BpeConfig,
    ) -> Result<Self, TokenizerError> {
        let map: HashMap<String, TokenId> = serde_json::from_str(vocab_json)
            .map_err(|e| TokenizerError::InvalidDescription(format!("vocab.json: {}", e)))?;
        let vocab = Vocabulary::from_map(map)?;
        let ranks = MergeRanks::from_text(merges_txt)?;
        Self::new(vocab, ranks, config)
    }

    /// Build from `vocab.json` and `merges.txt` files.
    pub fn from_files(
        vocab_path: &Path,
        merges_path: &Path,
        config: BpeConfig,
    ) -> Result<Self, TokenizerError> {
        let vocab_json = std::fs::read_to_string(vocab_path)?;
        let merges_txt = std::fs::read_to_string(merges_path)?;
        Self::from_strs(&vocab_json, &merges_txt, config)
    }

    pub fn config(&self) -> &BpeConfig {
        &self.config
    }

    fn normalize(&self, text: &str) -> String {
        let text = if self.config.collapse_whitespace {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            text.to_string()
        };
        if self.config.lowercase {
            text.to_lowercase()
        } else {
            text
        }
    }

    /// Token ids for the text, without BOS/EOS.
    fn content_ids(&self, text: &str) -> Vec<TokenId> {
        let normalized = self.normalize(text);
        let mut ids = Vec::new();
        for segment in self.specials.split(&normalized) {
            match segment {
                Segment::Added(id) => ids.push(id),
                Segment::Text(run) => {
                    for chunk in self.pattern.find_iter(run) {
                        self.encode_chunk(chunk.as_str(), &mut ids);
                    }
                }
            }
        }
        ids
    }

    fn encode_chunk(&self, chunk: &str, ids: &mut Vec<TokenId>) {
        if chunk.is_empty() {
            return;
        }
        let mapped = if self.config.byte_level {
            self.bytes.encode(chunk)
        } else {
            chunk.to_string()
        };

        let merged = self.cache.get_or_merge(&mapped, || {
            let mut symbols: Vec<String> = mapped.chars().map(String::from).collect();
            if let (Some(suffix), Some(last)) =
                (&self.config.end_of_word_suffix, symbols.last_mut())
            {
                last.push_str(suffix);
            }
            merge_symbols(symbols, &self.ranks)
        });

        for symbol in merged.iter() {
            match self.vocab.id(symbol).or(self.unk_id) {
                Some(id) => ids.push(id),
                None => tracing::warn!(symbol = %symbol, "BPE symbol missing from vocabulary, dropped"),
            }
        }
    }
}

impl Tokenizer for ByteLevelBpe {
    fn max_length(&self) -> usize {
        self.config.max_length
    }

    fn encode_with_length(
        &self,
        text: &str,
        max_length: usize,
    ) -> Result<EncodedInput, TokenizerError> {
        let reserved = self.config.reserved();
        if max_length <= reserved {
            return Err(TokenizerError::InvalidMaxLength { max_length, minimum: reserved + 1 });
        }

        let mut content = self.content_ids(text);
        telemetry::record_tokens_encoded("bpe", content.len());
        // BOS stays at index 0 and EOS at the last kept index.
        content.truncate(max_length - reserved);

        let mut ids = Vec::with_capacity(content.len() + reserved);
        ids.extend(self.bos_id);
        ids.extend(content);
        ids.extend(self.eos_id);

        let encoded = EncodedInput::single(ids);
        Ok(if self.config.padding { encoded.pad_to(max_length) } else { encoded })
    }

    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError> {
        let mut joined = String::new();
        for &id in ids {
            if Some(id) == self.bos_id || Some(id) == self.eos_id {
                continue;
            }
            let token = self.vocab.token(id).ok_or(TokenizerError::InvalidToken(id))?;
            joined.push_str(token);
        }

        let mut text = if self.config.byte_level {
            self.bytes.decode(&joined)
        } else {
            joined
        };
        if let Some(suffix) = &self.config.end_of_word_suffix {
            text = text.replace(suffix.as_str(), " ");
            text.truncate(text.trim_end_matches(' ').len());
        }
        Ok(text)
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
