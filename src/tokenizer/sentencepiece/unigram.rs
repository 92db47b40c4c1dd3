//! Viterbi segmentation for the Unigram model.

use std::collections::HashMap;

use super::super::TokenId;

/// Score penalty of an unknown single-character edge below the worst piece.
const UNKNOWN_PENALTY: f64 = 10.0;

/// One piece of the best path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece {
    Known(TokenId),
    /// Byte range of a character no vocabulary piece covers.
    Unknown(usize, usize),
}

/// Piece table searched by the lattice.
#[derive(Debug, Clone)]
pub(crate) struct UnigramModel {
    pieces: HashMap<String, (TokenId, f64)>,
    max_piece_chars: usize,
    unknown_score: f64,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    score: f64,
    start: usize,
    piece: Piece,
}

impl UnigramModel {
    /// `pieces` are `(surface, id, log-probability)`; `max_piece_chars` caps
    /// the candidate length searched from each position.
    pub(crate) fn new<I>(pieces: I, max_piece_chars: usize) -> Self
    where
        I: IntoIterator<Item = (String, TokenId, f64)>,
    {
        let mut table = HashMap::new();
        let mut longest = 1;
        let mut min_score = 0.0_f64;
        for (surface, id, score) in pieces {
            if surface.is_empty() {
                continue;
            }
            longest = longest.max(surface.chars().count());
            min_score = min_score.min(score);
            table.entry(surface).or_insert((id, score));
        }

        Self {
            pieces: table,
            max_piece_chars: longest.min(max_piece_chars.max(1)),
            unknown_score: min_score - UNKNOWN_PENALTY,
        }
    }

    /// Highest-scoring segmentation of `text`.
    ///
    /// Every character is reachable: a position with no single-character
    /// piece gets an unknown edge scored below every real piece.
    pub(crate) fn segment(&self, text: &str) -> Vec<Piece> {
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = bounds.len() - 1;
        if n == 0 {
            return Vec::new();
        }

        // best[i] is the best path covering the first i characters.
        let mut best: Vec<Option<Node>> = vec![None; n + 1];
        best[0] = Some(Node { score: 0.0, start: 0, piece: Piece::Known(0) });

        for start in 0..n {
            let Some(base) = best[start].map(|node| node.score) else { continue };

            let mut has_single = false;
            let limit = n.min(start + self.max_piece_chars);
            for end in start + 1..=limit {
                let surface = &text[bounds[start]..bounds[end]];
                let Some(&(id, score)) = self.pieces.get(surface) else { continue };
                if end == start + 1 {
                    has_single = true;
                }
                relax(&mut best[end], base + score, start, Piece::Known(id));
            }

            if !has_single {
                let piece = Piece::Unknown(bounds[start], bounds[start + 1]);
                relax(&mut best[start + 1], base + self.unknown_score, start, piece);
            }
        }

        let mut path = Vec::new();
        let mut pos = n;
        while pos > 0 {
            let Some(node) = best[pos] else { break };
            path.push(node.piece);
            pos = node.start;
        }
        path.reverse();
        path
    }
}

/// Keep the first-found path on equal scores.
fn relax(slot: &mut Option<Node>, score: f64, start: usize, piece: Piece) {
    if slot.map_or(true, |node| score > node.score) {
        *slot = Some(Node { score, start, piece });
    }
}
