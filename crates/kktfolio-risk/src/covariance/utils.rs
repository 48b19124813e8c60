//! Utilities for covariance matrix inspection
//!
//! Small helpers used to validate estimator output before it is handed to the
//! optimizer: symmetry checks, symmetrization and detection of assets whose
//! returns never move.

use super::CovarianceError;
use ndarray::Array2;

/// Check whether a square matrix is symmetric within `tolerance`
///
/// Non-square matrices are never symmetric.
pub fn is_symmetric(matrix: &Array2<f64>, tolerance: f64) -> bool {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return false;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[[i, j]] - matrix[[j, i]]).abs() > tolerance {
                return false;
            }
        }
    }
    true
}

/// Return the symmetric part (M + Mᵀ) / 2 of a square matrix
pub fn symmetrize(matrix: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(CovarianceError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    Ok((matrix + &matrix.t()) / 2.0)
}

/// Indices of assets whose variance is at most `tolerance`
///
/// Such assets have an all-zero covariance row and column, which makes the
/// matrix singular. That is valid optimizer input, but worth reporting.
pub fn zero_variance_assets(cov: &Array2<f64>, tolerance: f64) -> Vec<usize> {
    cov.diag()
        .iter()
        .enumerate()
        .filter(|(_, var)| var.abs() <= tolerance)
        .map(|(i, _)| i)
        .collect()
}
