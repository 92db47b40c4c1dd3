//! WordPiece tokenizer for BERT-family encoders.
//!
//! Pipeline: added/special tokens are split out of the raw text, the rest is
//! cleaned, lowercased (optionally accent-stripped), split on whitespace,
//! punctuation and CJK ideographs, and every word is segmented greedily by
//! longest vocabulary prefix with `##` continuations.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::added::{AddedTokens, Segment};
use super::vocab::Vocabulary;
use super::{EncodedInput, TokenId, Tokenizer, TokenizerError, DEFAULT_MAX_LENGTH};
use crate::telemetry;

/// Words are CJK ideographs, single punctuation/ASCII-symbol characters, or
/// runs of anything else that is not whitespace.
const WORD_PATTERN: &str =
    r"\p{Han}|[\p{P}!-/:-@\[-`{-~]|[^\s\p{P}\p{Han}!-/:-@\[-`{-~]+";

/// Configuration for [`WordPiece`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WordPieceConfig {
    pub lowercase: bool,
    /// Strip combining accents; `None` follows `lowercase`.
    pub strip_accents: Option<bool>,
    pub unk_token: String,
    pub cls_token: String,
    pub sep_token: String,
    pub pad_token: String,
    pub mask_token: String,
    pub continuation_prefix: String,
    /// Longer words map straight to the unknown token.
    pub max_input_chars_per_word: usize,
    /// Right-pad to the requested length.
    pub padding: bool,
    /// Length used by [`Tokenizer::encode`].
    pub max_length: usize,
}

impl Default for WordPieceConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_accents: None,
            unk_token: "[UNK]".to_string(),
            cls_token: "[CLS]".to_string(),
            sep_token: "[SEP]".to_string(),
            pad_token: "[PAD]".to_string(),
            mask_token: "[MASK]".to_string(),
            continuation_prefix: "##".to_string(),
            max_input_chars_per_word: 100,
            padding: true,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl WordPieceConfig {
    pub fn validate(&self) -> Result<(), TokenizerError> {
        if self.continuation_prefix.is_empty() {
            return Err(TokenizerError::InvalidConfig(
                "continuation_prefix cannot be empty".into(),
            ));
        }
        if self.max_input_chars_per_word == 0 {
            return Err(TokenizerError::InvalidConfig(
                "max_input_chars_per_word must be > 0".into(),
            ));
        }
        if self.max_length < 2 {
            return Err(TokenizerError::InvalidMaxLength { max_length: self.max_length, minimum: 2 });
        }
        Ok(())
    }

    fn strips_accents(&self) -> bool {
        self.strip_accents.unwrap_or(self.lowercase)
    }
}

/// BERT-style WordPiece tokenizer.
pub struct WordPiece {
    config: WordPieceConfig,
    vocab: Vocabulary,
    words: Regex,
    specials: AddedTokens,
    unk_id: TokenId,
    cls_id: TokenId,
    sep_id: TokenId,
    /// Ids never printed by `decode`.
    control_ids: Vec<TokenId>,
}

impl WordPiece {
    /// Build from a vocabulary; `[UNK]`, `[CLS]` and `[SEP]` must be present.
    pub fn new(vocab: Vocabulary, config: WordPieceConfig) -> Result<Self, TokenizerError> {
        config.validate()?;

        let unk_id = vocab.require(&config.unk_token)?;
        let cls_id = vocab.require(&config.cls_token)?;
        let sep_id = vocab.require(&config.sep_token)?;

        let special_strings = [
            &config.unk_token,
            &config.cls_token,
            &config.sep_token,
            &config.pad_token,
            &config.mask_token,
        ];
        let specials = AddedTokens::new(
            special_strings
                .iter()
                .filter_map(|t| vocab.id(t).map(|id| (t.to_string(), id))),
        )?;
        let control_ids = [&config.cls_token, &config.sep_token, &config.pad_token]
            .iter()
            .filter_map(|t| vocab.id(t))
            .collect();

        let words = Regex::new(WORD_PATTERN)
            .map_err(|e| TokenizerError::InvalidPattern(e.to_string()))?;

        tracing::info!(vocab = vocab.len(), lowercase = config.lowercase, "WordPiece tokenizer ready");

        Ok(Self {
            config,
            vocab,
            words,
            specials,
            unk_id,
            cls_id,
            sep_id,
            control_ids,
        })
    }

    /// Build from `vocab.txt` content (one token per line, id = line number).
    pub fn from_vocab_str(vocab_txt: &str, config: WordPieceConfig) -> Result<Self, TokenizerError> {
        Self::new(Vocabulary::from_lines(vocab_txt)?, config)
    }

    /// Build from a `vocab.txt` file.
    pub fn from_vocab_file(path: &Path, config: WordPieceConfig) -> Result<Self, TokenizerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_vocab_str(&text, config)
    }

    pub fn config(&self) -> &WordPieceConfig {
        &self.config
    }

    /// Subword ids for `text`, without sentinels.
    pub fn tokenize(&self, text: &str) -> Vec<TokenId> {
        let mut ids = Vec::new();
        for segment in self.specials.split(text) {
            match segment {
                Segment::Added(id) => ids.push(id),
                Segment::Text(run) => {
                    let cleaned = self.normalize(run);
                    for word in self.words.find_iter(&cleaned) {
                        self.segment_word(word.as_str(), &mut ids);
                    }
                }
            }
        }
        ids
    }

    fn normalize(&self, text: &str) -> String {
        let cleaned: String = text
            .chars()
            .filter(|&c| c != '\0' && c != char::REPLACEMENT_CHARACTER)
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .filter(|c| !c.is_control())
            .collect();

        let cased = if self.config.lowercase {
            cleaned.to_lowercase()
        } else {
            cleaned
        };
        if self.config.strips_accents() {
            cased.nfd().filter(|&c| !is_combining_mark(c)).collect()
        } else {
            cased
        }
    }

    /// Greedy longest-prefix segmentation of one word.
    fn segment_word(&self, word: &str, ids: &mut Vec<TokenId>) {
        let bounds: Vec<usize> = word
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(word.len()))
            .collect();
        let char_count = bounds.len() - 1;
        if char_count > self.config.max_input_chars_per_word {
            ids.push(self.unk_id);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < char_count {
            let mut end = char_count;
            let mut found = None;
            while start < end {
                let piece = &word[bounds[start]..bounds[end]];
                let id = if start == 0 {
                    self.vocab.id(piece)
                } else {
                    self.vocab.id(&format!("{}{}", self.config.continuation_prefix, piece))
                };
                if id.is_some() {
                    found = id;
                    break;
                }
                end -= 1;
            }

            match found {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    // One unmatched remainder makes the whole word unknown.
                    ids.push(self.unk_id);
                    return;
                }
            }
        }
        ids.extend(pieces);
    }

    fn finish(&self, encoded: EncodedInput, max_length: usize) -> EncodedInput {
        if self.config.padding {
            encoded.pad_to(max_length)
        } else {
            encoded
        }
    }
}

impl Tokenizer for WordPiece {
    fn max_length(&self) -> usize {
        self.config.max_length
    }

    fn encode_with_length(
        &self,
        text: &str,
        max_length: usize,
    ) -> Result<EncodedInput, TokenizerError> {
        if max_length < 2 {
            return Err(TokenizerError::InvalidMaxLength { max_length, minimum: 2 });
        }

        let mut tokens = self.tokenize(text);
        telemetry::record_tokens_encoded("wordpiece", tokens.len());
        tokens.truncate(max_length - 2);

        let mut ids = Vec::with_capacity(tokens.len() + 2);
        ids.push(self.cls_id);
        ids.extend(tokens);
        ids.push(self.sep_id);

        Ok(self.finish(EncodedInput::single(ids), max_length))
    }

    /// `[CLS] A [SEP] B [SEP]` with longest-first truncation.
    fn encode_pair(
        &self,
        first: &str,
        second: &str,
        max_length: usize,
    ) -> Result<EncodedInput, TokenizerError> {
        if max_length < 3 {
            return Err(TokenizerError::InvalidMaxLength { max_length, minimum: 3 });
        }

        let mut a = self.tokenize(first);
        let mut b = self.tokenize(second);
        telemetry::record_tokens_encoded("wordpiece", a.len() + b.len());

        let budget = max_length - 3;
        while a.len() + b.len() > budget {
            if a.len() > b.len() {
                a.pop();
            } else {
                b.pop();
            }
        }

        let first_len = a.len() + 2;
        let second_len = b.len() + 1;
        let mut ids = Vec::with_capacity(first_len + second_len);
        ids.push(self.cls_id);
        ids.extend(a);
        ids.push(self.sep_id);
        ids.extend(b);
        ids.push(self.sep_id);

        let mut type_ids = vec![0; first_len];
        type_ids.resize(first_len + second_len, 1);

        Ok(self.finish(EncodedInput::with_segments(ids, type_ids), max_length))
    }

    /// Joins `##` continuations onto the previous word; sentinels and padding
    /// are skipped.
    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError> {
        let mut text = String::new();
        for &id in ids {
            if self.control_ids.contains(&id) {
                continue;
            }
            let token = self.vocab.token(id).ok_or(TokenizerError::InvalidToken(id))?;
            match token.strip_prefix(self.config.continuation_prefix.as_str()) {
                Some(rest) if !text.is_empty() => text.push_str(rest),
                _ => {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(token);
                }
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    const VOCAB: &str = "[PAD]\n[UNK]\n[CLS]\n[SEP]\n[MASK]\ntest\n##ing\nhello\nworld\n,\nun\n##aff\n##able\ncafe\n日\n本";

    fn tokenizer() -> WordPiece {
        let config = WordPieceConfig { padding: false, ..WordPieceConfig::default() };
        WordPiece::from_vocab_str(VOCAB, config).unwrap()
    }

    #[test]
    fn greedy_longest_prefix() {
        let wp = tokenizer();
        assert_eq!(wp.tokenize("testing"), vec![5, 6]);
        assert_eq!(wp.tokenize("unaffable"), vec![10, 11, 12]);
    }

    #[test]
    fn unmatched_word_is_unknown() {
        let wp = tokenizer();
        assert_eq!(wp.tokenize("testx"), vec![1]);
    }

    #[test]
    fn punctuation_and_case() {
        let wp = tokenizer();
        assert_eq!(wp.tokenize("Hello, WORLD"), vec![7, 9, 8]);
    }

    #[test]
    fn accents_stripped_when_lowercasing() {
        let wp = tokenizer();
        assert_eq!(wp.tokenize("Café"), vec![13]);
    }

    #[test]
    fn cjk_characters_split() {
        let wp = tokenizer();
        assert_eq!(wp.tokenize("日本"), vec![14, 15]);
    }

    #[test]
    fn special_tokens_are_atomic() {
        let wp = tokenizer();
        assert_eq!(wp.tokenize("hello [MASK]"), vec![7, 4]);
    }

    #[test]
    fn overlong_word_is_unknown() {
        let config = WordPieceConfig {
            max_input_chars_per_word: 3,
            padding: false,
            ..WordPieceConfig::default()
        };
        let wp = WordPiece::from_vocab_str(VOCAB, config).unwrap();
        assert_eq!(wp.tokenize("hello"), vec![1]);
    }

    #[test]
    fn missing_sentinel_fails_construction() {
        let result = WordPiece::from_vocab_str("[PAD]\n[UNK]\nhello", WordPieceConfig::default());
        assert!(matches!(result, Err(TokenizerError::MissingToken(_))));
    }

    #[test]
    fn decode_joins_continuations() {
        let wp = tokenizer();
        assert_eq!(wp.decode(&[2, 5, 6, 8, 3, 0]).unwrap(), "testing world");
    }
}
