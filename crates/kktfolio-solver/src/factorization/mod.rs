//! Dense matrix factorizations
//!
//! Each backend factorizes a square matrix once and can then solve for any
//! right-hand side. Singularity is judged against `tolerance` times the
//! matrix scale, so callers should equilibrate the matrix first.

pub mod cholesky;
pub mod lu;
pub mod qr;
pub mod svd;

pub use cholesky::CholeskyFactor;
pub use lu::LuFactor;
pub use qr::QrFactor;
pub use svd::{EigenDecomposition, SymmetricSvd, jacobi_eigendecomp};

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Reasons a factorization can be rejected
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FactorizationError {
    /// Matrix is not square
    #[error("Matrix is not square: {rows} x {cols}")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// LU pivot below the singularity threshold
    #[error("Singular pivot {pivot:e} at column {index}")]
    SingularPivot {
        /// Column where elimination broke down
        index: usize,
        /// Magnitude of the best available pivot
        pivot: f64,
    },

    /// Cholesky diagonal not strictly positive
    #[error("Matrix is not positive definite (pivot {pivot:e} at {index})")]
    NotPositiveDefinite {
        /// Row where the factorization broke down
        index: usize,
        /// Value of the failed diagonal entry
        pivot: f64,
    },

    /// Eigenvalue iteration did not reach the off-diagonal threshold
    #[error("Jacobi iteration did not converge after {sweeps} sweeps")]
    NoConvergence {
        /// Number of sweeps performed
        sweeps: usize,
    },
}

/// A factorized square matrix that can solve linear systems
pub trait Factorization: Sized {
    /// Factorize `matrix`, rejecting it if it is singular relative to `tolerance`
    fn factorize(matrix: &Array2<f64>, tolerance: f64) -> Result<Self, FactorizationError>;

    /// Solve `M x = rhs` with the stored factors
    fn solve(&self, rhs: &Array1<f64>) -> Array1<f64>;
}

pub(crate) fn check_square(matrix: &Array2<f64>) -> Result<usize, FactorizationError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(FactorizationError::NotSquare { rows, cols });
    }
    Ok(rows)
}

/// Largest absolute entry of a matrix
pub fn max_abs(matrix: &Array2<f64>) -> f64 {
    matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Infinity norm of a vector
pub fn inf_norm(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}
