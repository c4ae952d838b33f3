//! Significance of pairwise correlations.

use crate::error::{NicheError, Result};
use nalgebra::DMatrix;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-values for a correlation matrix.
///
/// Uses the Student-t statistic `t = r √((n - 2) / (1 - r²))` with `n - 2`
/// degrees of freedom. With fewer than three samples there is no evidence
/// either way and every off-diagonal p-value is 1. The diagonal is 0.
pub fn correlation_pvalues(correlations: &DMatrix<f64>, n_samples: usize) -> Result<DMatrix<f64>> {
    let d = correlations.nrows();
    let mut p_values = DMatrix::from_element(d, d, 1.0);
    for i in 0..d {
        p_values[(i, i)] = 0.0;
    }
    if n_samples < 3 {
        return Ok(p_values);
    }

    let df = (n_samples - 2) as f64;
    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| NicheError::Numerical(format!("Student-t distribution: {}", e)))?;

    for i in 0..d {
        for j in (i + 1)..d {
            let r = correlations[(i, j)];
            let p = if !r.is_finite() {
                1.0
            } else if r.abs() >= 1.0 {
                0.0
            } else {
                let statistic = r * (df / (1.0 - r * r)).sqrt();
                (2.0 * (1.0 - t_dist.cdf(statistic.abs()))).clamp(0.0, 1.0)
            };
            p_values[(i, j)] = p;
            p_values[(j, i)] = p;
        }
    }
    Ok(p_values)
}
