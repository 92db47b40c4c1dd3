//! Vocabulary and merge-rank tables.
//!
//! Both are built once at tokenizer construction and never mutated.

use std::collections::HashMap;

use super::{TokenId, TokenizerError};

/// Bidirectional token <-> id mapping.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    token_to_id: HashMap<String, TokenId>,
    id_to_token: HashMap<TokenId, String>,
}

impl Vocabulary {
    /// Build from an explicit token -> id map. Ids must be unique.
    pub fn from_map(map: HashMap<String, TokenId>) -> Result<Self, TokenizerError> {
        let mut id_to_token = HashMap::with_capacity(map.len());
        for (token, &id) in &map {
            if let Some(previous) = id_to_token.insert(id, token.clone()) {
                return Err(TokenizerError::InvalidConfig(format!(
                    "id {} assigned to both {:?} and {:?}",
                    id, previous, token
                )));
            }
        }
        Ok(Self { token_to_id: map, id_to_token })
    }

    /// Build from an ordered token list; the id is the list position.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let map = tokens
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.into(), i as TokenId))
            .collect::<Vec<_>>();
        let mut token_to_id = HashMap::with_capacity(map.len());
        for (token, id) in map {
            // Later duplicates keep the first id, matching line-based vocab loaders.
            token_to_id.entry(token).or_insert(id);
        }
        Self::from_map(token_to_id)
    }

    /// Parse a line-per-token vocabulary (`vocab.txt`); the id is the line number.
    ///
    /// Blank lines consume an id but register no token.
    pub fn from_lines(text: &str) -> Result<Self, TokenizerError> {
        let mut token_to_id = HashMap::new();
        for (i, line) in text.lines().enumerate() {
            let token = line.trim_end_matches('\r');
            if token.is_empty() {
                continue;
            }
            token_to_id.entry(token.to_string()).or_insert(i as TokenId);
        }
        if token_to_id.is_empty() {
            return Err(TokenizerError::InvalidConfig("vocabulary is empty".into()));
        }
        Self::from_map(token_to_id)
    }

    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(&id).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    /// Look up a token that must exist.
    pub fn require(&self, token: &str) -> Result<TokenId, TokenizerError> {
        self.id(token)
            .ok_or_else(|| TokenizerError::MissingToken(token.to_string()))
    }

    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }
}

/// Merge priorities for adjacent symbol pairs (lower rank merges first).
#[derive(Debug, Clone, Default)]
pub struct MergeRanks {
    // Nested so lookups take two `&str` without allocating a pair key.
    ranks: HashMap<String, HashMap<String, usize>>,
    len: usize,
}

impl MergeRanks {
    /// Build from ordered pairs; the rank is the position. Duplicates keep
    /// their first rank.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut ranks: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut len = 0;
        for (rank, (left, right)) in pairs.into_iter().enumerate() {
            let inner = ranks.entry(left).or_default();
            if !inner.contains_key(&right) {
                inner.insert(right, rank);
                len += 1;
            }
        }
        Self { ranks, len }
    }

    /// Parse newline-separated `left right` pairs (`merges.txt`).
    ///
    /// A leading `#version` header and blank lines are skipped.
    pub fn from_text(text: &str) -> Result<Self, TokenizerError> {
        let mut pairs = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || (line_no == 0 && line.starts_with("#version")) {
                continue;
            }
            pairs.push(split_merge_line(line).ok_or_else(|| {
                TokenizerError::InvalidConfig(format!(
                    "malformed merge on line {}: {:?}",
                    line_no + 1,
                    line
                ))
            })?);
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn rank(&self, left: &str, right: &str) -> Option<usize> {
        self.ranks.get(left)?.get(right).copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Split a `left right` merge entry on its single separating space.
pub(crate) fn split_merge_line(line: &str) -> Option<(String, String)> {
    let (left, right) = line.split_once(' ')?;
    if left.is_empty() || right.is_empty() || right.contains(' ') {
        return None;
    }
    Some((left.to_string(), right.to_string()))
}
