//! Softmax family, sigmoid and vector normalization.

/// Overflow-safe softmax.
///
/// The maximum is subtracted before exponentiating so large logits never
/// overflow. Equal inputs yield a uniform distribution. An empty input yields
/// an empty output.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = max_value(logits);
    if max == f32::NEG_INFINITY {
        // Every entry is masked out; fall back to uniform instead of 0/0.
        let uniform = 1.0 / logits.len() as f32;
        return vec![uniform; logits.len()];
    }

    let mut out: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = out.iter().sum();
    for p in &mut out {
        *p /= sum;
    }
    out
}

/// `x - (max + ln(sum(exp(x - max))))` for every entry.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = max_value(logits);
    let sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let log_norm = max + sum.ln();
    logits.iter().map(|&x| x - log_norm).collect()
}

/// Logistic function for a single value.
#[inline]
pub fn sigmoid_scalar(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Element-wise logistic function.
pub fn sigmoid(values: &[f32]) -> Vec<f32> {
    values.iter().map(|&x| sigmoid_scalar(x)).collect()
}

/// Divide a vector by its Euclidean norm.
///
/// A zero vector (norm == 0) is returned unchanged rather than producing NaNs.
pub fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|&x| x / norm).collect()
}

/// Index of the largest value; the first occurrence wins on ties.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    // An all-NaN row still has a well-defined answer.
    Some(best.map_or(0, |(i, _)| i))
}

fn max_value(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}
