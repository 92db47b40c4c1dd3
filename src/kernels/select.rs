//! Top-K selection.

/// Indices of the `k` largest values, in descending value order.
///
/// `k` is clamped to the input length. Ties keep the earlier index first.
/// Runs in O(n·k) using a small sorted window, which beats a full sort for
/// the small `k` used by classification heads and detection pre-filters.
/// NaN values never displace a real value.
pub fn top_k(values: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(values.len());
    if k == 0 {
        return Vec::new();
    }

    let mut selected: Vec<usize> = Vec::with_capacity(k + 1);
    for (i, &v) in values.iter().enumerate() {
        // Strict `>` keeps first-seen order among equal values.
        let pos = selected
            .iter()
            .position(|&j| v > values[j] || (values[j].is_nan() && !v.is_nan()))
            .unwrap_or(selected.len());
        if pos < k {
            selected.insert(pos, i);
            selected.truncate(k);
        }
    }
    selected
}
