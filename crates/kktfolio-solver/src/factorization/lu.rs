//! LU factorization with partial pivoting
//!
//! P M = L U with unit lower-triangular L. General purpose: works for the
//! indefinite KKT matrix and for objective blocks that are not PSD.

use super::{Factorization, FactorizationError, check_square, max_abs};
use ndarray::{Array1, Array2};

/// Packed LU factors and the row permutation
#[derive(Debug, Clone)]
pub struct LuFactor {
    /// L below the diagonal (unit diagonal implied), U on and above it
    lu: Array2<f64>,
    /// perm[i] is the original row placed at position i
    perm: Vec<usize>,
}

impl Factorization for LuFactor {
    fn factorize(matrix: &Array2<f64>, tolerance: f64) -> Result<Self, FactorizationError> {
        let n = check_square(matrix)?;
        let threshold = tolerance * max_abs(matrix).max(f64::MIN_POSITIVE);
        let mut lu = matrix.clone();
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            // Partial pivoting: largest magnitude in column k, lowest row on ties
            let mut pivot_row = k;
            let mut pivot_val = lu[[k, k]].abs();
            for i in (k + 1)..n {
                let candidate = lu[[i, k]].abs();
                if candidate > pivot_val {
                    pivot_val = candidate;
                    pivot_row = i;
                }
            }

            if pivot_val <= threshold {
                return Err(FactorizationError::SingularPivot {
                    index: k,
                    pivot: pivot_val,
                });
            }

            if pivot_row != k {
                for j in 0..n {
                    lu.swap([k, j], [pivot_row, j]);
                }
                perm.swap(k, pivot_row);
            }

            let pivot = lu[[k, k]];
            for i in (k + 1)..n {
                let factor = lu[[i, k]] / pivot;
                lu[[i, k]] = factor;
                if factor != 0.0 {
                    for j in (k + 1)..n {
                        lu[[i, j]] -= factor * lu[[k, j]];
                    }
                }
            }
        }

        Ok(Self { lu, perm })
    }

    fn solve(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let n = self.perm.len();

        // Forward substitution with the permuted right-hand side
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = rhs[self.perm[i]];
            for j in 0..i {
                sum -= self.lu[[i, j]] * y[j];
            }
            y[i] = sum;
        }

        // Back substitution
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum / self.lu[[i, i]];
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
    fn test_lu_solves_spd() {
        let m = spd_3x3();
        let x_true = array![1.0, -2.0, 0.5];
        let rhs = m.dot(&x_true);

        let x = LuFactor::factorize(&m, 1e-12).unwrap().solve(&rhs);
        for i in 0..3 {
            assert_abs_diff_eq!(x[i], x_true[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lu_solves_indefinite_kkt() {
        // min 1/2 (x1² + x2²) s.t. x1 + x2 = 1 -> x = (0.5, 0.5), λ = -0.5
        let x = LuFactor::factorize(&kkt_2x1(), 1e-12)
            .unwrap()
            .solve(&array![0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(x[1], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(x[2], -0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_lu_needs_pivoting() {
        let m = array![[0.0, 1.0], [1.0, 0.0]];
        let x = LuFactor::factorize(&m, 1e-12)
            .unwrap()
            .solve(&array![3.0, 7.0]);
        assert_abs_diff_eq!(x[0], 7.0, epsilon = 1e-15);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_lu_rejects_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            LuFactor::factorize(&m, 1e-10),
            Err(FactorizationError::SingularPivot { index: 1, .. })
        ));
    }

    #[test]
    fn test_lu_rejects_non_square() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            LuFactor::factorize(&m, 1e-10),
            Err(FactorizationError::NotSquare { rows: 2, cols: 3 })
        ));
    }
}
