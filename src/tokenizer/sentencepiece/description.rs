//! Schema of the JSON tokenizer description (`tokenizer.json`).
//!
//! Only the fields the SentencePiece families read are modelled; everything
//! else in the file is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use super::super::vocab::split_merge_line;
use super::super::{TokenId, TokenizerError};

#[derive(Debug, Deserialize)]
pub(crate) struct Description {
    #[serde(default)]
    pub added_tokens: Vec<AddedTokenEntry>,
    pub model: ModelDescription,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddedTokenEntry {
    pub id: TokenId,
    pub content: String,
    #[serde(default = "default_special")]
    pub special: bool,
}

fn default_special() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ModelDescription {
    #[serde(rename = "BPE")]
    Bpe {
        vocab: HashMap<String, TokenId>,
        #[serde(default)]
        merges: Merges,
        #[serde(default)]
        unk_token: Option<String>,
        #[serde(default)]
        byte_fallback: bool,
    },
    Unigram {
        vocab: Vec<(String, f64)>,
        #[serde(default)]
        unk_id: Option<usize>,
        #[serde(default)]
        byte_fallback: bool,
    },
}

/// Merge list: one newline-separated string, or an array whose entries are
/// `"a b"` strings or `["a", "b"]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Merges {
    Text(String),
    List(Vec<MergeEntry>),
}

impl Default for Merges {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MergeEntry {
    Line(String),
    Pair(String, String),
}

impl Merges {
    /// Merge pairs in priority order.
    pub fn into_pairs(self) -> Result<Vec<(String, String)>, TokenizerError> {
        let malformed =
            |line: &str| TokenizerError::InvalidDescription(format!("malformed merge: {:?}", line));
        match self {
            Self::Text(text) => text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| split_merge_line(line).ok_or_else(|| malformed(line)))
                .collect(),
            Self::List(entries) => entries
                .into_iter()
                .map(|entry| match entry {
                    MergeEntry::Pair(left, right) => Ok((left, right)),
                    MergeEntry::Line(line) => split_merge_line(&line).ok_or_else(|| malformed(&line)),
                })
                .collect(),
        }
    }
}

impl Description {
    pub fn parse(json: &str) -> Result<Self, TokenizerError> {
        serde_json::from_str(json).map_err(|e| TokenizerError::InvalidDescription(e.to_string()))
    }
}
