//! CTC greedy decoding.

use super::activation::argmax;

/// Greedy CTC decode over a row-major `[frames x num_classes]` score matrix.
///
/// Picks the best class per frame, collapses repeats and drops `blank`.
/// A trailing partial row is ignored.
pub fn ctc_greedy_decode(logits: &[f32], num_classes: usize, blank: usize) -> Vec<usize> {
    if num_classes == 0 {
        return Vec::new();
    }
    let frames: Vec<usize> = logits
        .chunks_exact(num_classes)
        .filter_map(argmax)
        .collect();
    ctc_collapse(&frames, blank)
}

/// Collapse repeated labels and remove `blank` from per-frame labels.
///
/// A blank between two equal labels separates them, so `a _ a` decodes to
/// `a a`.
pub fn ctc_collapse(frames: &[usize], blank: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut prev: Option<usize> = None;
    for &label in frames {
        if label != blank && prev != Some(label) {
            out.push(label);
        }
        prev = Some(label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_repeats_and_blanks() {
        assert_eq!(ctc_collapse(&[0, 1, 1, 0, 1, 2, 2, 0], 0), vec![1, 1, 2]);
        assert!(ctc_collapse(&[0, 0, 0], 0).is_empty());
    }

    #[test]
    fn greedy_decode_from_scores() {
        // 4 frames, 3 classes (blank = 0)
        let logits = [
            0.1, 0.8, 0.1, //
            0.1, 0.7, 0.2, //
            0.9, 0.05, 0.05, //
            0.1, 0.1, 0.8,
        ];
        assert_eq!(ctc_greedy_decode(&logits, 3, 0), vec![1, 2]);
    }
}
