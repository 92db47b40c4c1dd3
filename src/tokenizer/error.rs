//! Tokenizer error types.
//!
//! Configuration problems are reported at construction time; a tokenizer
//! that constructs successfully never fails on ordinary text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Invalid tokenizer configuration: {0}")]
    InvalidConfig(String),

    #[error("Required token missing from vocabulary: {0}")]
    MissingToken(String),

    #[error("Invalid token ID: {0}")]
    InvalidToken(i64),

    #[error("max_length {max_length} is below the minimum of {minimum}")]
    InvalidMaxLength { max_length: usize, minimum: usize },

    #[error("Invalid tokenizer description: {0}")]
    InvalidDescription(String),

    #[error("Invalid pre-tokenization pattern: {0}")]
    InvalidPattern(String),

    #[error("Operation not supported by this tokenizer: {0}")]
    Unsupported(String),

    #[error("Failed to read tokenizer file: {0}")]
    Io(#[from] std::io::Error),
}

impl TokenizerError {
    /// True for errors raised while building a tokenizer.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::MissingToken(_)
                | Self::InvalidDescription(_)
                | Self::InvalidPattern(_)
                | Self::Io(_)
        )
    }
}
