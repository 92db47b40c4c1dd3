//! Atomic recognition of added (control) tokens.
//!
//! Added tokens are matched against the raw input before any normalization
//! or subword segmentation, leftmost-longest, so `<start_of_turn>` always
//! wins over a shorter overlapping entry such as `<start`.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, MatchKind};

use super::{TokenId, TokenizerError};

/// One piece of input after splitting around added tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Ordinary text to be normalized and segmented.
    Text(&'a str),
    /// A matched added token.
    Added(TokenId),
}

/// Set of literal strings with reserved ids.
#[derive(Debug, Clone, Default)]
pub struct AddedTokens {
    matcher: Option<AhoCorasick>,
    ids: Vec<TokenId>,
    by_content: HashMap<String, TokenId>,
}

impl AddedTokens {
    /// Build a matcher from `(content, id)` pairs. Empty strings are ignored.
    pub fn new<I>(entries: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = (String, TokenId)>,
    {
        let mut contents = Vec::new();
        let mut ids = Vec::new();
        let mut by_content = HashMap::new();
        for (content, id) in entries {
            if content.is_empty() || by_content.contains_key(&content) {
                continue;
            }
            by_content.insert(content.clone(), id);
            contents.push(content);
            ids.push(id);
        }

        let matcher = if contents.is_empty() {
            None
        } else {
            let built = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&contents)
                .map_err(|e| {
                    TokenizerError::InvalidConfig(format!("added-token matcher: {}", e))
                })?;
            Some(built)
        };

        Ok(Self { matcher, ids, by_content })
    }

    /// Split `text` into ordinary text runs and matched added tokens, in order.
    ///
    /// Empty text runs are omitted.
    pub fn split<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let Some(matcher) = &self.matcher else {
            return if text.is_empty() {
                Vec::new()
            } else {
                vec![Segment::Text(text)]
            };
        };

        let mut segments = Vec::new();
        let mut cursor = 0;
        for m in matcher.find_iter(text) {
            if m.start() > cursor {
                segments.push(Segment::Text(&text[cursor..m.start()]));
            }
            segments.push(Segment::Added(self.ids[m.pattern().as_usize()]));
            cursor = m.end();
        }
        if cursor < text.len() {
            segments.push(Segment::Text(&text[cursor..]));
        }
        segments
    }

    pub fn id(&self, content: &str) -> Option<TokenId> {
        self.by_content.get(content).copied()
    }

    pub fn contains_id(&self, id: TokenId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
