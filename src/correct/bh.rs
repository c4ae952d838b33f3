//! Benjamini-Hochberg false discovery rate correction.

/// Apply Benjamini-Hochberg FDR correction.
///
/// The BH procedure controls the false discovery rate (FDR) at level α.
/// For each p-value, the adjusted p-value (q-value) is calculated as:
/// q[i] = min(p[i] * n / rank[i], q[i+1])
///
/// Returns q-values in the original order.
pub fn correct_bh(p_values: &[f64]) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return vec![];
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut q_sorted = vec![0.0; n];
    let n_f64 = n as f64;

    // Start from largest p-value
    q_sorted[n - 1] = p_values[indices[n - 1]].min(1.0);

    // Work backwards
    for i in (0..n - 1).rev() {
        let rank = i + 1;
        let adjusted = p_values[indices[i]] * n_f64 / rank as f64;
        q_sorted[i] = adjusted.min(q_sorted[i + 1]).min(1.0);
    }

    let mut q_values = vec![0.0; n];
    for (i, &orig_idx) in indices.iter().enumerate() {
        q_values[orig_idx] = q_sorted[i];
    }
    q_values
}
