//! Quadratic program definition
//!
//! ```text
//! minimize     1/2 wᵀ Q w + cᵀ w
//! subject to   A w  = b
//!              G w <= h
//! ```
//!
//! A [`QpProblem`] is validated when it is built and immutable afterwards.
//! Q is stored as its symmetric part (Q + Qᵀ)/2, which leaves the objective
//! unchanged and keeps the KKT matrix symmetric.

use crate::error::SolverError;
use ndarray::{Array1, Array2, s};

/// Dense quadratic program with equality and inequality constraints
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    q: Array2<f64>,
    c: Array1<f64>,
    a: Array2<f64>,
    b: Array1<f64>,
    g: Array2<f64>,
    h: Array1<f64>,
}

fn ensure_finite<'a, I>(values: I, name: &'static str) -> Result<(), SolverError>
where
    I: IntoIterator<Item = &'a f64>,
{
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::NonFinite(name))
    }
}

impl QpProblem {
    /// Create an unconstrained problem from the objective matrix and linear term
    ///
    /// # Errors
    /// Returns an error if Q is empty or not square, if c has the wrong length,
    /// or if either contains a non-finite value.
    pub fn new(q: Array2<f64>, c: Array1<f64>) -> Result<Self, SolverError> {
        let n = q.nrows();
        if n == 0 {
            return Err(SolverError::DimensionMismatch {
                context: "objective matrix",
                expected: 1,
                actual: 0,
            });
        }
        if q.ncols() != n {
            return Err(SolverError::DimensionMismatch {
                context: "objective matrix columns",
                expected: n,
                actual: q.ncols(),
            });
        }
        if c.len() != n {
            return Err(SolverError::DimensionMismatch {
                context: "linear term",
                expected: n,
                actual: c.len(),
            });
        }
        ensure_finite(q.iter(), "objective matrix")?;
        ensure_finite(c.iter(), "linear term")?;

        let q = (&q + &q.t()) / 2.0;
        Ok(Self {
            q,
            c,
            a: Array2::zeros((0, n)),
            b: Array1::zeros(0),
            g: Array2::zeros((0, n)),
            h: Array1::zeros(0),
        })
    }

    /// Append equality rows `A w = b`
    pub fn with_equality(mut self, a: Array2<f64>, b: Array1<f64>) -> Result<Self, SolverError> {
        self.check_rows(&a, &b, "equality")?;
        self.a = stack_rows(&self.a, &a);
        self.b = stack_vec(&self.b, &b);
        Ok(self)
    }

    /// Append inequality rows `G w <= h`
    pub fn with_inequality(mut self, g: Array2<f64>, h: Array1<f64>) -> Result<Self, SolverError> {
        self.check_rows(&g, &h, "inequality")?;
        self.g = stack_rows(&self.g, &g);
        self.h = stack_vec(&self.h, &h);
        Ok(self)
    }

    fn check_rows(
        &self,
        matrix: &Array2<f64>,
        rhs: &Array1<f64>,
        context: &'static str,
    ) -> Result<(), SolverError> {
        if matrix.ncols() != self.n_vars() {
            return Err(SolverError::DimensionMismatch {
                context,
                expected: self.n_vars(),
                actual: matrix.ncols(),
            });
        }
        if rhs.len() != matrix.nrows() {
            return Err(SolverError::DimensionMismatch {
                context,
                expected: matrix.nrows(),
                actual: rhs.len(),
            });
        }
        ensure_finite(matrix.iter().chain(rhs.iter()), context)
    }

    /// Number of decision variables
    pub fn n_vars(&self) -> usize {
        self.q.nrows()
    }

    /// Number of equality rows
    pub fn n_eq(&self) -> usize {
        self.a.nrows()
    }

    /// Number of inequality rows
    pub fn n_ineq(&self) -> usize {
        self.g.nrows()
    }

    /// Whether the problem has any inequality rows
    pub fn has_inequalities(&self) -> bool {
        self.n_ineq() > 0
    }

    /// Objective matrix Q (symmetric)
    pub const fn q(&self) -> &Array2<f64> {
        &self.q
    }

    /// Linear term c
    pub const fn c(&self) -> &Array1<f64> {
        &self.c
    }

    /// Equality matrix A
    pub const fn a(&self) -> &Array2<f64> {
        &self.a
    }

    /// Equality right-hand side b
    pub const fn b(&self) -> &Array1<f64> {
        &self.b
    }

    /// Inequality matrix G
    pub const fn g(&self) -> &Array2<f64> {
        &self.g
    }

    /// Inequality right-hand side h
    pub const fn h(&self) -> &Array1<f64> {
        &self.h
    }

    /// Objective value 1/2 wᵀ Q w + cᵀ w
    pub fn objective(&self, w: &Array1<f64>) -> f64 {
        0.5 * w.dot(&self.q.dot(w)) + self.c.dot(w)
    }

    /// Equality residual A w - b
    pub fn equality_residual(&self, w: &Array1<f64>) -> Array1<f64> {
        self.a.dot(w) - &self.b
    }

    /// Inequality slack G w - h (positive entries are violations)
    pub fn inequality_slack(&self, w: &Array1<f64>) -> Array1<f64> {
        self.g.dot(w) - &self.h
    }

    /// Largest violated part of G w - h, zero when every inequality holds
    pub fn max_inequality_violation(&self, w: &Array1<f64>) -> f64 {
        self.inequality_slack(w)
            .iter()
            .fold(0.0_f64, |acc, &v| acc.max(v))
    }

    /// Elastic feasibility problem over z = (w, s)
    ///
    /// ```text
    /// minimize     1/2 s²
    /// subject to   A w = b
    ///              G w - s <= h
    ///                   -s <= 0
    /// ```
    ///
    /// Any w with A w = b extends to a feasible point by taking
    /// s = max(0, max(G w - h)). The optimum has s = 0 exactly when the
    /// original rows admit a common solution.
    pub fn feasibility_problem(&self) -> Result<Self, SolverError> {
        let n = self.n_vars();
        let m = self.n_ineq();

        let mut q = Array2::zeros((n + 1, n + 1));
        q[[n, n]] = 1.0;

        let mut a = Array2::zeros((self.n_eq(), n + 1));
        a.slice_mut(s![.., ..n]).assign(&self.a);

        let mut g = Array2::zeros((m + 1, n + 1));
        g.slice_mut(s![..m, ..n]).assign(&self.g);
        g.column_mut(n).fill(-1.0);
        let h = stack_vec(&self.h, &Array1::zeros(1));

        Self::new(q, Array1::zeros(n + 1))?
            .with_equality(a, self.b.clone())?
            .with_inequality(g, h)
    }

    /// Euclidean norm of the equality residual and the violated part of G w - h
    pub fn violation_norm(&self, w: &Array1<f64>) -> f64 {
        let eq: f64 = self.equality_residual(w).iter().map(|r| r * r).sum();
        let ineq: f64 = self
            .inequality_slack(w)
            .iter()
            .map(|v| v.max(0.0).powi(2))
            .sum();
        (eq + ineq).sqrt()
    }
}

fn stack_rows(top: &Array2<f64>, bottom: &Array2<f64>) -> Array2<f64> {
    let n = top.ncols();
    let mut out = Array2::zeros((top.nrows() + bottom.nrows(), n));
    out.slice_mut(s![..top.nrows(), ..]).assign(top);
    out.slice_mut(s![top.nrows().., ..]).assign(bottom);
    out
}

fn stack_vec(top: &Array1<f64>, bottom: &Array1<f64>) -> Array1<f64> {
    top.iter().chain(bottom.iter()).copied().collect()
}
