//! Cholesky factorization M = L Lᵀ
//!
//! Only valid for symmetric positive definite matrices. A diagonal entry at
//! or below `tolerance` times the largest diagonal rejects the matrix, which
//! is how semi-definite covariance matrices are detected and routed to a
//! fallback.

use super::{Factorization, FactorizationError, check_square};
use ndarray::{Array1, Array2};

/// Lower-triangular Cholesky factor
#[derive(Debug, Clone)]
pub struct CholeskyFactor {
    l: Array2<f64>,
}

impl CholeskyFactor {
    /// Solve `M X = B` column by column
    pub fn solve_matrix(&self, rhs: &Array2<f64>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros(rhs.dim());
        for (j, column) in rhs.columns().into_iter().enumerate() {
            out.column_mut(j).assign(&self.solve(&column.to_owned()));
        }
        out
    }

    /// The lower-triangular factor L
    pub const fn lower(&self) -> &Array2<f64> {
        &self.l
    }
}

impl Factorization for CholeskyFactor {
    fn factorize(matrix: &Array2<f64>, tolerance: f64) -> Result<Self, FactorizationError> {
        let n = check_square(matrix)?;
        let scale = matrix
            .diag()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
            .max(f64::MIN_POSITIVE);
        let threshold = tolerance * scale;
        let mut l = Array2::<f64>::zeros((n, n));

        for j in 0..n {
            let mut diag = matrix[[j, j]];
            for k in 0..j {
                diag -= l[[j, k]] * l[[j, k]];
            }
            if diag <= threshold {
                return Err(FactorizationError::NotPositiveDefinite {
                    index: j,
                    pivot: diag,
                });
            }
            let l_jj = diag.sqrt();
            l[[j, j]] = l_jj;

            for i in (j + 1)..n {
                let mut sum = matrix[[i, j]];
                for k in 0..j {
                    sum -= l[[i, k]] * l[[j, k]];
                }
                l[[i, j]] = sum / l_jj;
            }
        }

        Ok(Self { l })
    }

    fn solve(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let n = self.l.nrows();

        // L y = rhs
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = rhs[i];
            for k in 0..i {
                sum -= self.l[[i, k]] * y[k];
            }
            y[i] = sum / self.l[[i, i]];
        }

        // Lᵀ x = y
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n {
                sum -= self.l[[k, i]] * x[k];
            }
            x[i] = sum / self.l[[i, i]];
        }

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factorization::test_support::{kkt_2x1, spd_3x3};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_cholesky_reconstructs() {
        let m = spd_3x3();
        let factor = CholeskyFactor::factorize(&m, 1e-12).unwrap();
        let l = factor.lower();
        let rebuilt = l.dot(&l.t());
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(rebuilt[[i, j]], m[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_solve() {
        let m = spd_3x3();
        let x_true = array![0.3, 0.2, -1.0];
        let x = CholeskyFactor::factorize(&m, 1e-12)
            .unwrap()
            .solve(&m.dot(&x_true));
        for i in 0..3 {
            assert_abs_diff_eq!(x[i], x_true[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cholesky_solve_matrix() {
        let m = spd_3x3();
        let inv = CholeskyFactor::factorize(&m, 1e-12)
            .unwrap()
            .solve_matrix(&Array2::eye(3));
        let identity = m.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(identity[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        assert!(matches!(
            CholeskyFactor::factorize(&kkt_2x1(), 1e-12),
            Err(FactorizationError::NotPositiveDefinite { index: 2, .. })
        ));
    }

    #[test]
    fn test_cholesky_rejects_semidefinite() {
        // Duplicated asset: rank one covariance
        let m = array![[0.04, 0.04], [0.04, 0.04]];
        assert!(matches!(
            CholeskyFactor::factorize(&m, 1e-10),
            Err(FactorizationError::NotPositiveDefinite { index: 1, .. })
        ));
    }
}
