//! The immutable result of encoding text.

use serde::Serialize;

use super::TokenId;

/// Token ids plus the attention mask and segment ids a model expects.
///
/// All three sequences always have the same length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedInput {
    input_ids: Vec<TokenId>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
}

impl EncodedInput {
    /// Single-segment encoding: mask all ones, segment ids all zero.
    pub(crate) fn single(input_ids: Vec<TokenId>) -> Self {
        let len = input_ids.len();
        Self {
            input_ids,
            attention_mask: vec![1; len],
            token_type_ids: vec![0; len],
        }
    }

    /// Encoding with explicit segment ids; mask all ones.
    pub(crate) fn with_segments(input_ids: Vec<TokenId>, token_type_ids: Vec<i64>) -> Self {
        debug_assert_eq!(input_ids.len(), token_type_ids.len());
        let len = input_ids.len();
        Self {
            input_ids,
            attention_mask: vec![1; len],
            token_type_ids,
        }
    }

    /// Right-pad every sequence with zeros up to `length`.
    pub(crate) fn pad_to(mut self, length: usize) -> Self {
        if self.input_ids.len() < length {
            self.input_ids.resize(length, 0);
            self.attention_mask.resize(length, 0);
            self.token_type_ids.resize(length, 0);
        }
        self
    }

    pub fn input_ids(&self) -> &[TokenId] {
        &self.input_ids
    }

    pub fn attention_mask(&self) -> &[i64] {
        &self.attention_mask
    }

    pub fn token_type_ids(&self) -> &[i64] {
        &self.token_type_ids
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions.
    pub fn real_length(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }

    /// Ids of the non-padding positions.
    pub fn real_ids(&self) -> Vec<TokenId> {
        self.input_ids
            .iter()
            .zip(&self.attention_mask)
            .filter(|(_, &m)| m == 1)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Consume into `(input_ids, attention_mask, token_type_ids)`.
    pub fn into_parts(self) -> (Vec<TokenId>, Vec<i64>, Vec<i64>) {
        (self.input_ids, self.attention_mask, self.token_type_ids)
    }
}
