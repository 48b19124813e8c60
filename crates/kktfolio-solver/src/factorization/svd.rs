//! Truncated SVD for symmetric matrices
//!
//! The KKT matrix is symmetric, so its singular value decomposition follows
//! from the eigendecomposition M = V Λ Vᵀ: singular values are |λᵢ| and the
//! pseudo-inverse is V Λ⁺ Vᵀ. Eigenvalues whose magnitude is at or below
//! `tolerance * max(1, σ_max)` are dropped, which yields the minimum-norm
//! least-squares solution for singular or near-singular systems.
//!
//! The eigendecomposition uses cyclic Jacobi rotations: slow for large
//! matrices but stable, deterministic and dependency free.

use super::{Factorization, FactorizationError, check_square};
use ndarray::{Array1, Array2};

/// Maximum number of full Jacobi sweeps
pub const MAX_JACOBI_SWEEPS: usize = 100;

/// Result of a symmetric eigenvalue decomposition
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues (sorted in descending order)
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors (columns are eigenvectors)
    pub eigenvectors: Array2<f64>,
}

/// Pseudo-inverse factors of a symmetric matrix
#[derive(Debug, Clone)]
pub struct SymmetricSvd {
    decomposition: EigenDecomposition,
    cutoff: f64,
}

impl SymmetricSvd {
    /// Singular values in descending order
    pub fn singular_values(&self) -> Array1<f64> {
        let mut values: Vec<f64> = self
            .decomposition
            .eigenvalues
            .iter()
            .map(|v| v.abs())
            .collect();
        values.sort_by(|a, b| b.total_cmp(a));
        Array1::from_vec(values)
    }

    /// Number of singular values kept after truncation
    pub fn rank(&self) -> usize {
        self.decomposition
            .eigenvalues
            .iter()
            .filter(|v| v.abs() > self.cutoff)
            .count()
    }

    /// Threshold below which singular values are discarded
    pub const fn cutoff(&self) -> f64 {
        self.cutoff
    }
}

impl Factorization for SymmetricSvd {
    fn factorize(matrix: &Array2<f64>, tolerance: f64) -> Result<Self, FactorizationError> {
        let decomposition = jacobi_eigendecomp(matrix, MAX_JACOBI_SWEEPS)?;
        let sigma_max = decomposition
            .eigenvalues
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let cutoff = tolerance * sigma_max.max(1.0);

        Ok(Self {
            decomposition,
            cutoff,
        })
    }

    fn solve(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let v = &self.decomposition.eigenvectors;
        let mut x = Array1::<f64>::zeros(v.nrows());

        for (k, &lambda) in self.decomposition.eigenvalues.iter().enumerate() {
            if lambda.abs() <= self.cutoff {
                continue;
            }
            let column = v.column(k);
            let coeff = column.dot(rhs) / lambda;
            x.scaled_add(coeff, &column);
        }

        x
    }
}

/// Cyclic Jacobi eigenvalue decomposition for symmetric matrices
///
/// # Arguments
/// * `matrix` - Symmetric matrix to decompose
/// * `max_sweeps` - Maximum number of passes over all off-diagonal pairs
///
/// # Returns
/// * Eigenvalues (descending) and eigenvectors
pub fn jacobi_eigendecomp(
    matrix: &Array2<f64>,
    max_sweeps: usize,
) -> Result<EigenDecomposition, FactorizationError> {
    let n = check_square(matrix)?;

    // Initialize: A = copy of input matrix, V = identity
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    let frobenius: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let threshold = f64::EPSILON * frobenius.max(f64::MIN_POSITIVE);

    let mut converged = n < 2;
    let mut sweeps = 0;
    while !converged && sweeps < max_sweeps {
        sweeps += 1;
        for p in 0..n {
            for q in (p + 1)..n {
                // Entries at roundoff level are dropped; this moves eigenvalues by at most `threshold`
                if a[[p, q]].abs() <= threshold {
                    a[[p, q]] = 0.0;
                    a[[q, p]] = 0.0;
                    continue;
                }
                let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
                apply_jacobi_rotation(&mut a, &mut v, p, q, cos_theta, sin_theta);
            }
        }
        converged = off_diagonal_norm(&a) <= n as f64 * threshold;
    }

    if !converged {
        return Err(FactorizationError::NoConvergence { sweeps });
    }

    // Sort eigenvalues and eigenvectors in descending order
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let eigenvalues = indices.iter().map(|&i| a[[i, i]]).collect();
    let mut eigenvectors = Array2::<f64>::zeros((n, n));
    for (new_idx, &old_idx) in indices.iter().enumerate() {
        eigenvectors.column_mut(new_idx).assign(&v.column(old_idx));
    }

    Ok(EigenDecomposition {
        eigenvalues,
        eigenvectors,
    })
}

fn off_diagonal_norm(matrix: &Array2<f64>) -> f64 {
    let n = matrix.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            sum += 2.0 * matrix[[i, j]] * matrix[[i, j]];
        }
    }
    sum.sqrt()
}

/// Compute the rotation (cos, sin) that annihilates a[p][q]
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let tau = (aqq - app) / (2.0 * apq);
    let t = if tau >= 0.0 {
        1.0 / (tau + (1.0 + tau * tau).sqrt())
    } else {
        -1.0 / (-tau + (1.0 + tau * tau).sqrt())
    };

    let cos_theta = 1.0 / (1.0 + t * t).sqrt();
    let sin_theta = t * cos_theta;

    (cos_theta, sin_theta)
}

/// Apply a Jacobi rotation to matrix A and eigenvector matrix V
fn apply_jacobi_rotation(
    a: &mut Array2<f64>,
    v: &mut Array2<f64>,
    p: usize,
    q: usize,
    cos_theta: f64,
    sin_theta: f64,
) {
    let n = a.nrows();

    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = cos_theta * cos_theta * app - 2.0 * cos_theta * sin_theta * apq
        + sin_theta * sin_theta * aqq;
    a[[q, q]] = sin_theta * sin_theta * app
        + 2.0 * cos_theta * sin_theta * apq
        + cos_theta * cos_theta * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];

            a[[i, p]] = cos_theta * aip - sin_theta * aiq;
            a[[p, i]] = a[[i, p]];

            a[[i, q]] = sin_theta * aip + cos_theta * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];

        v[[i, p]] = cos_theta * vip - sin_theta * viq;
        v[[i, q]] = sin_theta * vip + cos_theta * viq;
    }
}
