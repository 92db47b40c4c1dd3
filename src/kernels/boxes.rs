//! Box geometry and greedy non-maximum suppression.
//!
//! Boxes are stored flat, four floats per box, in `[x1, y1, x2, y2]` corner
//! order unless a function says otherwise.

use super::select::top_k;

/// Floats per box in the flat layouts used here.
pub const BOX_STRIDE: usize = 4;

/// Intersection-over-union of two `[x1, y1, x2, y2]` boxes.
///
/// Degenerate boxes and zero-area overlaps give 0.
pub fn iou(a: &[f32], b: &[f32]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

/// Greedy NMS over flat corner boxes.
///
/// Candidates are visited in score-descending order; a candidate is dropped
/// when its IoU with an already kept box exceeds `iou_threshold`. The kept
/// indices are returned in score-descending order. Extra trailing floats in
/// `boxes` or extra scores beyond the shorter of the two are ignored.
pub fn nms(boxes: &[f32], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    let n = scores.len().min(boxes.len() / BOX_STRIDE);
    let order = top_k(&scores[..n], n);

    let mut kept: Vec<usize> = Vec::new();
    for idx in order {
        let candidate = box_at(boxes, idx);
        let suppressed = kept
            .iter()
            .any(|&k| iou(box_at(boxes, k), candidate) > iou_threshold);
        if !suppressed {
            kept.push(idx);
        }
    }
    kept
}

/// Convert `[cx, cy, w, h]` boxes to `[x1, y1, x2, y2]`.
pub fn cxcywh_to_xyxy(boxes: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(boxes.len() - boxes.len() % BOX_STRIDE);
    for b in boxes.chunks_exact(BOX_STRIDE) {
        let (cx, cy, w, h) = (b[0], b[1], b[2], b[3]);
        out.extend_from_slice(&[cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]);
    }
    out
}

#[inline]
fn box_at(boxes: &[f32], idx: usize) -> &[f32] {
    &boxes[idx * BOX_STRIDE..(idx + 1) * BOX_STRIDE]
}
