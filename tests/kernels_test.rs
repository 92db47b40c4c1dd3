//! Post-processing kernel tests.

use gg_text::kernels::{
    argmax, ctc_greedy_decode, cxcywh_to_xyxy, l2_normalize, log_softmax, nms, sigmoid, softmax,
    top_k, BOX_STRIDE,
};

const EPS: f32 = 1e-5;

// =============================================================================
// Activations
// =============================================================================

#[test]
fn softmax_is_a_distribution() {
    let inputs: [&[f32]; 3] = [&[1.0, 2.0, 3.0], &[-5.0, 0.0, 5.0, 10.0], &[1000.0, 999.0, -1000.0]];
    for logits in inputs {
        let probs = softmax(logits);
        assert_eq!(probs.len(), logits.len());
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < EPS);
        assert!(probs.iter().all(|p| p.is_finite() && *p >= 0.0));
        assert_eq!(argmax(&probs), argmax(logits));
    }
}

#[test]
fn softmax_of_equal_values_is_uniform() {
    let probs = softmax(&[4.0; 4]);
    for p in probs {
        assert!((p - 0.25).abs() < EPS);
    }
}

#[test]
fn log_softmax_matches_log_of_softmax() {
    let logits = [0.5, -1.0, 2.0];
    let probs = softmax(&logits);
    for (lp, p) in log_softmax(&logits).iter().zip(probs) {
        assert!((lp - p.ln()).abs() < 1e-4);
    }
}

#[test]
fn sigmoid_midpoint_and_bounds() {
    let out = sigmoid(&[0.0, 50.0, -50.0]);
    assert!((out[0] - 0.5).abs() < EPS);
    assert!(out[1] <= 1.0 && out[1] > 0.99);
    assert!(out[2] >= 0.0 && out[2] < 0.01);
}

#[test]
fn l2_normalize_unit_norm() {
    let v = l2_normalize(&[3.0, 4.0]);
    assert!((v[0] - 0.6).abs() < EPS);
    assert!((v[1] - 0.8).abs() < EPS);
    assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn top_k_returns_largest_in_order() {
    let values = [0.2, 0.8, 0.5, 0.8, 0.1];
    let picked = top_k(&values, 3);
    assert_eq!(picked, vec![1, 3, 2]);
    for pair in picked.windows(2) {
        assert!(values[pair[0]] >= values[pair[1]]);
    }
    let min_picked = picked.iter().map(|&i| values[i]).fold(f32::INFINITY, f32::min);
    for (i, &v) in values.iter().enumerate() {
        if !picked.contains(&i) {
            assert!(v <= min_picked);
        }
    }
}

#[test]
fn argmax_ties_and_empty() {
    assert_eq!(argmax(&[1.0, 3.0, 3.0]), Some(1));
    assert_eq!(argmax(&[]), None);
}

// =============================================================================
// Boxes
// =============================================================================

#[test]
fn nms_kept_boxes_never_overlap_beyond_threshold() {
    let centers = [
        5.0, 5.0, 10.0, 10.0, //
        6.0, 5.0, 10.0, 10.0, //
        5.0, 6.0, 10.0, 10.0, //
        30.0, 30.0, 8.0, 8.0, //
        31.0, 30.0, 8.0, 8.0,
    ];
    let boxes = cxcywh_to_xyxy(&centers);
    let scores = [0.9, 0.95, 0.6, 0.7, 0.8];
    let threshold = 0.5;
    let kept = nms(&boxes, &scores, threshold);

    assert_eq!(kept, vec![1, 4]);
    for (i, &a) in kept.iter().enumerate() {
        for &b in &kept[i + 1..] {
            let iou = gg_text::kernels::iou(
                &boxes[a * BOX_STRIDE..(a + 1) * BOX_STRIDE],
                &boxes[b * BOX_STRIDE..(b + 1) * BOX_STRIDE],
            );
            assert!(iou <= threshold);
        }
    }
}

#[test]
fn nms_threshold_one_keeps_all() {
    let boxes = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
    assert_eq!(nms(&boxes, &[0.3, 0.4], 1.0), vec![1, 0]);
}

// =============================================================================
// CTC
// =============================================================================

#[test]
fn ctc_greedy_collapses_repeats_and_blanks() {
    // Frames (3 classes, blank = 0): 1 1 0 1 2 2 0
    let frames = [1usize, 1, 0, 1, 2, 2, 0];
    let mut logits = Vec::new();
    for &f in &frames {
        let mut row = [0.0f32; 3];
        row[f] = 1.0;
        logits.extend_from_slice(&row);
    }
    assert_eq!(ctc_greedy_decode(&logits, 3, 0), vec![1, 1, 2]);
}
