// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommands for `gg-text-cli`.
//!
//! ## Usage
//!
//! ```bash
//! gg-text-cli tokenize --kind wordpiece vocab.txt "hello world"
//! gg-text-cli tokenize --kind bpe --preset clip vocab.json merges.txt "a photo"
//! gg-text-cli decode --kind sentencepiece tokenizer.json 3,17,42
//! gg-text-cli config show
//! ```

pub mod config_cmd;
pub mod tokenize_cmd;

use thiserror::Error;

use crate::config::ConfigError;
use crate::tokenizer::TokenizerError;

/// Exit code for bad arguments.
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            _ => 1,
        }
    }
}
