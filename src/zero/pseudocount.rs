//! Pseudocount addition for zero handling.

use crate::error::{NicheError, Result};
use nalgebra::DMatrix;

/// Check that a pseudocount is usable (finite and non-negative).
pub fn validate_pseudocount(pseudocount: f64) -> Result<()> {
    if !pseudocount.is_finite() || pseudocount < 0.0 {
        return Err(NicheError::InvalidParameter(format!(
            "Pseudocount must be finite and non-negative, got {}",
            pseudocount
        )));
    }
    Ok(())
}

/// Add a pseudocount to all entries, converting count rows to a dense matrix.
///
/// The pseudocount is added to every entry (zero and non-zero) so relative
/// relationships are preserved. Rows must all have the same length and hold
/// non-negative finite values.
///
/// # Common choices
/// - 0.5: Often used as a compromise
/// - 1.0: Laplace smoothing, simple and interpretable
pub fn add_pseudocount(counts: &[Vec<f64>], pseudocount: f64) -> Result<DMatrix<f64>> {
    validate_pseudocount(pseudocount)?;

    let n_rows = counts.len();
    let n_cols = counts.first().map_or(0, Vec::len);

    for (row, values) in counts.iter().enumerate() {
        if values.len() != n_cols {
            return Err(NicheError::DimensionMismatch {
                expected: n_cols,
                actual: values.len(),
            });
        }
        if let Some(col) = values.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(NicheError::InvalidCount {
                value: values[col].to_string(),
                row,
                col,
            });
        }
    }

    Ok(DMatrix::from_fn(n_rows, n_cols, |i, j| {
        counts[i][j] + pseudocount
    }))
}
