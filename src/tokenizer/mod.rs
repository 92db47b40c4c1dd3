//! Tokenizer family: WordPiece, byte-level BPE and SentencePiece (BPE / Unigram).
//!
//! Every family implements [`Tokenizer`], so callers never branch on which
//! kind they hold. Construction validates the configuration and fails fast;
//! a constructed tokenizer is immutable and safe to share across threads.

mod added;
mod bpe;
mod byte_level;
mod encoded;
mod error;
mod sentencepiece;
mod vocab;
mod wordpiece;

pub use added::{AddedTokens, Segment};
pub use bpe::{BpeConfig, ByteLevelBpe, CLIP_PATTERN, GPT2_PATTERN};
pub use encoded::EncodedInput;
pub use error::TokenizerError;
pub use sentencepiece::{ModelKind, PrependScheme, SentencePiece, SentencePieceConfig};
pub use vocab::{MergeRanks, Vocabulary};
pub use wordpiece::{WordPiece, WordPieceConfig};

/// Vocabulary index as fed to models (int64 tensors).
pub type TokenId = i64;

/// Encode length used when a config does not override it.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Common tokenizer capability.
pub trait Tokenizer: Send + Sync {
    /// Default encode length for this tokenizer.
    fn max_length(&self) -> usize;

    /// Encode with the tokenizer's default max length.
    fn encode(&self, text: &str) -> Result<EncodedInput, TokenizerError> {
        self.encode_with_length(text, self.max_length())
    }

    /// Encode a single sequence, truncating (and padding if configured) to `max_length`.
    fn encode_with_length(&self, text: &str, max_length: usize)
        -> Result<EncodedInput, TokenizerError>;

    /// Encode a sentence pair. Only families with a pair template support this.
    fn encode_pair(
        &self,
        _first: &str,
        _second: &str,
        _max_length: usize,
    ) -> Result<EncodedInput, TokenizerError> {
        Err(TokenizerError::Unsupported(
            "sentence-pair encoding is not available for this tokenizer".into(),
        ))
    }

    /// Ids back to text; special tokens are skipped.
    fn decode(&self, ids: &[TokenId]) -> Result<String, TokenizerError>;

    fn vocab_size(&self) -> usize;

    fn token_to_id(&self, token: &str) -> Option<TokenId>;

    fn id_to_token(&self, id: TokenId) -> Option<&str>;
}
