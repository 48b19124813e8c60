//! Householder QR with column pivoting
//!
//! M P = Q R. Columns are chosen greedily by remaining norm, so the diagonal
//! of R decreases in magnitude and reveals the numerical rank. Solving uses
//! only the leading `rank` block of R and sets the remaining unknowns to zero
//! (the basic solution), which keeps rank-deficient constraint blocks usable.

use super::{Factorization, FactorizationError, check_square};
use ndarray::{Array1, Array2, s};

/// Compact QR factors with the column permutation and numerical rank
#[derive(Debug, Clone)]
pub struct QrFactor {
    /// Upper-triangular R (below-diagonal entries are zero)
    r: Array2<f64>,
    /// Householder vectors, one per elimination step
    reflectors: Vec<Array1<f64>>,
    /// perm[k] is the original column placed at position k
    perm: Vec<usize>,
    rank: usize,
}

impl QrFactor {
    /// Numerical rank found during factorization
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Apply Qᵀ to a vector
    fn apply_qt(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let mut y = rhs.clone();
        for (k, v) in self.reflectors.iter().enumerate() {
            let mut tail = y.slice_mut(s![k..]);
            let proj = 2.0 * v.dot(&tail);
            tail.scaled_add(-proj, v);
        }
        y
    }
}

impl Factorization for QrFactor {
    fn factorize(matrix: &Array2<f64>, tolerance: f64) -> Result<Self, FactorizationError> {
        let n = check_square(matrix)?;
        let mut r = matrix.clone();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut reflectors = Vec::with_capacity(n);

        for k in 0..n {
            // Pivot on the column with the largest remaining norm, lowest index on ties
            let mut best_col = k;
            let mut best_norm = -1.0;
            for j in k..n {
                let norm: f64 = r.slice(s![k.., j]).iter().map(|v| v * v).sum();
                if norm > best_norm {
                    best_norm = norm;
                    best_col = j;
                }
            }
            if best_col != k {
                for i in 0..n {
                    r.swap([i, k], [i, best_col]);
                }
                perm.swap(k, best_col);
            }

            let x = r.slice(s![k.., k]).to_owned();
            let norm_x = best_norm.max(0.0).sqrt();
            if norm_x == 0.0 {
                // Remaining block is exactly zero
                break;
            }

            let alpha = if x[0] >= 0.0 { -norm_x } else { norm_x };
            let mut v = x;
            v[0] -= alpha;
            let v_norm = v.dot(&v).sqrt();
            if v_norm == 0.0 {
                reflectors.push(Array1::zeros(n - k));
                continue;
            }
            v /= v_norm;

            // R[k.., k..] -= 2 v (vᵀ R[k.., k..])
            for j in k..n {
                let mut column = r.slice_mut(s![k.., j]);
                let proj = 2.0 * v.dot(&column);
                column.scaled_add(-proj, &v);
            }
            for i in (k + 1)..n {
                r[[i, k]] = 0.0;
            }
            reflectors.push(v);
        }

        let lead = if n > 0 { r[[0, 0]].abs() } else { 0.0 };
        let threshold = tolerance * lead.max(f64::MIN_POSITIVE);
        let rank = (0..reflectors.len())
            .take_while(|&i| r[[i, i]].abs() > threshold)
            .count();

        Ok(Self {
            r,
            reflectors,
            perm,
            rank,
        })
    }

    fn solve(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let n = self.perm.len();
        let y = self.apply_qt(rhs);

        // Back substitution on the leading rank x rank block
        let mut z = Array1::<f64>::zeros(n);
        for i in (0..self.rank).rev() {
            let mut sum = y[i];
            for j in (i + 1)..self.rank {
                sum -= self.r[[i, j]] * z[j];
            }
            z[i] = sum / self.r[[i, i]];
        }

        let mut x = Array1::<f64>::zeros(n);
        for (k, &col) in self.perm.iter().enumerate() {
            x[col] = z[k];
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
    fn test_qr_full_rank_solve() {
        let m = spd_3x3();
        let x_true = array![2.0, -1.0, 0.25];
        let factor = QrFactor::factorize(&m, 1e-12).unwrap();
        assert_eq!(factor.rank(), 3);

        let x = factor.solve(&m.dot(&x_true));
        for i in 0..3 {
            assert_abs_diff_eq!(x[i], x_true[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_qr_indefinite_kkt() {
        let x = QrFactor::factorize(&kkt_2x1(), 1e-12)
            .unwrap()
            .solve(&array![0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[2], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_qr_detects_rank_deficiency() {
        // Third row is the sum of the first two
        let m = array![[1.0, 2.0, 3.0], [0.0, 1.0, 1.0], [1.0, 3.0, 4.0]];
        let factor = QrFactor::factorize(&m, 1e-10).unwrap();
        assert_eq!(factor.rank(), 2);

        // Consistent right-hand side: the basic solution satisfies the system
        let rhs = array![1.0, 2.0, 3.0];
        let x = factor.solve(&rhs);
        let residual = m.dot(&x) - &rhs;
        for r in residual.iter() {
            assert_abs_diff_eq!(*r, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_qr_zero_matrix() {
        let m = Array2::<f64>::zeros((2, 2));
        let factor = QrFactor::factorize(&m, 1e-10).unwrap();
        assert_eq!(factor.rank(), 0);
        assert_eq!(factor.solve(&array![1.0, 1.0]), array![0.0, 0.0]);
    }
}
