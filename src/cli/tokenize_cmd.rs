// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! `tokenize` and `decode` subcommands.
//!
//! Both take `--kind <wordpiece|bpe|sentencepiece>`, the tokenizer files for
//! that kind, and a trailing text (or comma-separated ids for `decode`).

use std::path::PathBuf;

use crate::tokenizer::{
    BpeConfig, ByteLevelBpe, SentencePiece, SentencePieceConfig, TokenId, Tokenizer, WordPiece,
    WordPieceConfig,
};

use super::CliError;

/// Parsed tokenizer selection plus the trailing positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerArgs {
    pub kind: String,
    pub preset: Option<String>,
    pub max_length: Option<usize>,
    pub files: Vec<PathBuf>,
    pub input: String,
}

impl TokenizerArgs {
    /// Parse `[--kind K] [--preset P] [--max-length N] <files...> <input>`.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut kind = None;
        let mut preset = None;
        let mut max_length = None;
        let mut positional = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| CliError::Usage(format!("{} requires a value", flag)))
            };
            match arg.as_str() {
                "--kind" => kind = Some(value("--kind")?),
                "--preset" => preset = Some(value("--preset")?),
                "--max-length" => {
                    let raw = value("--max-length")?;
                    let parsed = raw
                        .parse::<usize>()
                        .map_err(|_| CliError::Usage(format!("invalid --max-length: {}", raw)))?;
                    max_length = Some(parsed);
                }
                _ => positional.push(arg.clone()),
            }
        }

        let kind = kind.ok_or_else(|| CliError::Usage("--kind is required".into()))?;
        let input = positional
            .pop()
            .ok_or_else(|| CliError::Usage("missing input argument".into()))?;
        let expected = match kind.as_str() {
            "wordpiece" | "sentencepiece" => 1,
            "bpe" => 2,
            other => return Err(CliError::Usage(format!("unknown tokenizer kind: {}", other))),
        };
        if positional.len() != expected {
            return Err(CliError::Usage(format!(
                "{} needs {} file argument(s), got {}",
                kind,
                expected,
                positional.len()
            )));
        }

        Ok(Self {
            kind,
            preset,
            max_length,
            files: positional.into_iter().map(PathBuf::from).collect(),
            input,
        })
    }

    /// Build the selected tokenizer from its files.
    pub fn load(&self, default_max_length: usize) -> Result<Box<dyn Tokenizer>, CliError> {
        let max_length = self.max_length.unwrap_or(default_max_length);
        let tokenizer: Box<dyn Tokenizer> = match self.kind.as_str() {
            "wordpiece" => {
                let config = WordPieceConfig { max_length, ..WordPieceConfig::default() };
                Box::new(WordPiece::from_vocab_file(&self.files[0], config)?)
            }
            "bpe" => {
                let base = match self.preset.as_deref() {
                    None | Some("gpt2") => BpeConfig::gpt2(),
                    Some("clip") => BpeConfig::clip(),
                    Some(other) => {
                        return Err(CliError::Usage(format!("unknown BPE preset: {}", other)))
                    }
                };
                let max_length = self.max_length.unwrap_or(base.max_length);
                let config = BpeConfig { max_length, ..base };
                Box::new(ByteLevelBpe::from_files(&self.files[0], &self.files[1], config)?)
            }
            _ => {
                let config = SentencePieceConfig { max_length, ..SentencePieceConfig::default() };
                Box::new(SentencePiece::from_file(&self.files[0], config)?)
            }
        };
        Ok(tokenizer)
    }
}

/// Encode the input and print ids, mask and type ids as JSON.
pub fn run_tokenize(args: &[String], default_max_length: usize) -> Result<(), CliError> {
    let args = TokenizerArgs::parse(args)?;
    let tokenizer = args.load(default_max_length)?;
    let encoded = tokenizer.encode(&args.input)?;
    println!("{}", serde_json::to_string_pretty(&encoded)?);
    Ok(())
}

/// Decode comma-separated ids and print the text.
pub fn run_decode(args: &[String], default_max_length: usize) -> Result<(), CliError> {
    let args = TokenizerArgs::parse(args)?;
    let ids = parse_ids(&args.input)?;
    let tokenizer = args.load(default_max_length)?;
    println!("{}", tokenizer.decode(&ids)?);
    Ok(())
}

fn parse_ids(raw: &str) -> Result<Vec<TokenId>, CliError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<TokenId>()
                .map_err(|_| CliError::Usage(format!("invalid token id: {}", s)))
        })
        .collect()
}
