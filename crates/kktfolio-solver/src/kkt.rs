//! KKT system assembly and solution
//!
//! For an equality-constrained QP the optimality conditions are the linear
//! system
//!
//! ```text
//! [ Q   Aᵀ ] [w]   [-c]
//! [ A   0  ] [λ] = [ b]
//! ```
//!
//! The system is equilibrated before factorization: Q and c are scaled so that
//! max|Q| = 1, and each row of A (with its entry of b) so that its largest
//! entry is 1. Pivot and truncation tolerances are then relative, whatever the
//! magnitude of the covariance entries. Multipliers are unscaled on the way out.

use crate::config::{SolverConfig, SolverMethod};
use crate::error::SolverError;
use crate::factorization::{
    CholeskyFactor, Factorization, FactorizationError, LuFactor, QrFactor, SymmetricSvd, inf_norm,
    max_abs,
};
use ndarray::{Array1, Array2, Axis, s};
use tracing::debug;

/// Solution of one KKT system
#[derive(Debug, Clone, PartialEq)]
pub struct KktSolution {
    /// Primal variables
    pub w: Array1<f64>,
    /// Multipliers of the equality rows (Lagrangian sign convention: Qw + c + Aᵀλ = 0)
    pub lambda: Array1<f64>,
    /// Backend that produced the accepted solution
    pub method_used: SolverMethod,
    /// Infinity norm of the residual of the equilibrated system
    pub residual: f64,
}

/// Equilibrated KKT matrix and right-hand side
#[derive(Debug, Clone)]
pub struct KktSystem {
    q: Array2<f64>,
    c: Array1<f64>,
    a: Array2<f64>,
    b: Array1<f64>,
    matrix: Array2<f64>,
    rhs: Array1<f64>,
    q_scale: f64,
    row_scales: Array1<f64>,
}

impl KktSystem {
    /// Assemble and equilibrate the KKT system for (Q, c, A, b)
    pub fn assemble(
        q: &Array2<f64>,
        c: &Array1<f64>,
        a: &Array2<f64>,
        b: &Array1<f64>,
    ) -> Result<Self, SolverError> {
        let n = q.nrows();
        if q.ncols() != n {
            return Err(SolverError::DimensionMismatch {
                context: "KKT objective block",
                expected: n,
                actual: q.ncols(),
            });
        }
        if c.len() != n {
            return Err(SolverError::DimensionMismatch {
                context: "KKT linear term",
                expected: n,
                actual: c.len(),
            });
        }
        if a.ncols() != n {
            return Err(SolverError::DimensionMismatch {
                context: "KKT constraint block",
                expected: n,
                actual: a.ncols(),
            });
        }
        let m = a.nrows();
        if b.len() != m {
            return Err(SolverError::DimensionMismatch {
                context: "KKT constraint right-hand side",
                expected: m,
                actual: b.len(),
            });
        }

        let q_max = max_abs(q);
        let q_scale = if q_max > 0.0 { 1.0 / q_max } else { 1.0 };
        let row_scales: Array1<f64> = a
            .rows()
            .into_iter()
            .map(|row| {
                let row_max = row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
                if row_max > 0.0 { 1.0 / row_max } else { 1.0 }
            })
            .collect();

        let q = q * q_scale;
        let c = c * q_scale;
        let a = a * &row_scales.view().insert_axis(Axis(1));
        let b = b * &row_scales;

        let mut matrix = Array2::<f64>::zeros((n + m, n + m));
        matrix.slice_mut(s![..n, ..n]).assign(&q);
        matrix.slice_mut(s![..n, n..]).assign(&a.t());
        matrix.slice_mut(s![n.., ..n]).assign(&a);
        let rhs = c.iter().map(|v| -v).chain(b.iter().copied()).collect();

        Ok(Self {
            q,
            c,
            a,
            b,
            matrix,
            rhs,
            q_scale,
            row_scales,
        })
    }

    /// Number of primal variables
    pub fn n_vars(&self) -> usize {
        self.q.nrows()
    }

    /// Number of equality rows
    pub fn n_constraints(&self) -> usize {
        self.a.nrows()
    }

    /// The equilibrated KKT matrix
    pub const fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// The equilibrated right-hand side
    pub const fn rhs(&self) -> &Array1<f64> {
        &self.rhs
    }

    /// Infinity norm of K x - rhs
    pub fn residual(&self, x: &Array1<f64>) -> f64 {
        inf_norm(&(self.matrix.dot(x) - &self.rhs))
    }

    /// Largest residual accepted for a given tolerance
    pub fn acceptance_threshold(&self, tolerance: f64) -> f64 {
        tolerance.sqrt() * inf_norm(&self.rhs).max(1.0)
    }

    /// Solve with exactly one backend, without fallback
    pub fn solve_with(
        &self,
        method: SolverMethod,
        tolerance: f64,
    ) -> Result<Array1<f64>, FactorizationError> {
        match method {
            SolverMethod::Lu => Ok(LuFactor::factorize(&self.matrix, tolerance)?.solve(&self.rhs)),
            SolverMethod::Qr => Ok(QrFactor::factorize(&self.matrix, tolerance)?.solve(&self.rhs)),
            SolverMethod::Svd => {
                Ok(SymmetricSvd::factorize(&self.matrix, tolerance)?.solve(&self.rhs))
            }
            SolverMethod::Cholesky => self.solve_range_space(tolerance),
        }
    }

    /// Range-space solve: Cholesky of Q, then of the Schur complement A Q⁻¹ Aᵀ
    fn solve_range_space(&self, tolerance: f64) -> Result<Array1<f64>, FactorizationError> {
        let chol_q = CholeskyFactor::factorize(&self.q, tolerance)?;
        let qinv_c = chol_q.solve(&self.c);

        if self.n_constraints() == 0 {
            return Ok(-qinv_c);
        }

        let qinv_at = chol_q.solve_matrix(&self.a.t().to_owned());
        let schur = self.a.dot(&qinv_at);
        let schur = (&schur + &schur.t()) / 2.0;
        let chol_s = CholeskyFactor::factorize(&schur, tolerance)?;

        // S λ = -b - A Q⁻¹ c
        let lambda = chol_s.solve(&(-&self.b - self.a.dot(&qinv_c)));
        let w = -(qinv_c + qinv_at.dot(&lambda));

        Ok(w.into_iter().chain(lambda).collect())
    }

    /// Split a solution of the equilibrated system into (w, λ) of the original one
    pub fn unscale(&self, x: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let n = self.n_vars();
        let w = x.slice(s![..n]).to_owned();
        let lambda = &x.slice(s![n..]) * &self.row_scales / self.q_scale;
        (w, lambda)
    }
}

/// Solve the KKT system of (Q, c, A, b) with the configured method and its fallbacks
///
/// A backend's answer is accepted when the equilibrated residual is at most
/// `sqrt(tolerance) * max(1, |rhs|∞)` and the original rows hold to
/// `|A w - b|∞ <= tolerance * max(1, |b|∞)`. Anything looser falls through to
/// the next backend.
///
/// # Errors
/// * `SingularSystem` when every backend down to SVD fails either check
/// * `DimensionMismatch` for inconsistent block shapes
pub fn solve_kkt(
    q: &Array2<f64>,
    c: &Array1<f64>,
    a: &Array2<f64>,
    b: &Array1<f64>,
    config: &SolverConfig,
) -> Result<KktSolution, SolverError> {
    let system = KktSystem::assemble(q, c, a, b)?;
    let threshold = system.acceptance_threshold(config.tolerance);
    let primal_threshold = config.tolerance * inf_norm(b).max(1.0);
    let mut last_failure = (f64::INFINITY, threshold);
    let mut method = Some(config.method);

    while let Some(current) = method {
        match system.solve_with(current, config.tolerance) {
            Ok(x) => {
                let residual = system.residual(&x);
                if residual > threshold {
                    debug!(method = %current, residual, threshold, "KKT residual too large");
                    last_failure = (residual, threshold);
                } else {
                    let (w, lambda) = system.unscale(&x);
                    let primal = inf_norm(&(a.dot(&w) - b));
                    if primal <= primal_threshold {
                        return Ok(KktSolution {
                            w,
                            lambda,
                            method_used: current,
                            residual,
                        });
                    }
                    debug!(
                        method = %current,
                        primal,
                        threshold = primal_threshold,
                        "equality rows not met"
                    );
                    last_failure = (primal, primal_threshold);
                }
            }
            Err(e) => {
                debug!(method = %current, error = %e, "KKT factorization failed");
            }
        }

        method = current.fallback();
        if let Some(next) = method {
            debug!(from = %current, to = %next, "falling back to a more robust factorization");
        }
    }

    let (residual, threshold) = last_failure;
    Err(SolverError::SingularSystem {
        residual,
        threshold,
    })
}
