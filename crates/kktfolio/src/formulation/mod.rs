//! Problem formulations.
//!
//! Each [`ProblemType`] maps to a [`Formulation`] that turns asset statistics
//! into a [`QpProblem`] over one variable per asset. Variants differ in the
//! objective (and, for portfolios, a target-return row); the budget, long-only
//! and concentration rows are shared.
//!
//! Inequality rows are ordered: non-negativity rows (one per asset) first,
//! then concentration caps (one per asset).

pub mod lqr;
pub mod portfolio;
pub mod resource;
pub mod svm;

pub use lqr::LqrFormulation;
pub use portfolio::PortfolioFormulation;
pub use resource::ResourceFormulation;
pub use svm::SvmFormulation;

use crate::error::OptimizeError;
use crate::options::{ConstraintOptions, ProblemType};
use kktfolio_solver::QpProblem;
use ndarray::{Array1, Array2};
use tracing::debug;

/// Inputs shared by every formulation
#[derive(Debug, Clone, Copy)]
pub struct FormulationInput<'a> {
    /// Mean return per asset
    pub mean: &'a Array1<f64>,
    /// Covariance of asset returns
    pub covariance: &'a Array2<f64>,
    /// Per-period returns (periods x assets), when available
    pub returns: Option<&'a Array2<f64>>,
    /// Target expected return
    pub target_return: f64,
    /// Shared constraint rows
    pub constraints: &'a ConstraintOptions,
    /// Feasibility tolerance
    pub tolerance: f64,
}

impl FormulationInput<'_> {
    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.mean.len()
    }

    /// The return matrix, or `InvalidInput` naming the variant that needs it
    pub fn require_returns(&self, problem: ProblemType) -> Result<&Array2<f64>, OptimizeError> {
        let returns = self.returns.ok_or_else(|| {
            OptimizeError::InvalidInput(format!("{problem} formulation needs the return matrix"))
        })?;
        if returns.ncols() != self.n_assets() || returns.nrows() == 0 {
            return Err(OptimizeError::InvalidInput(format!(
                "return matrix is {}x{}, expected at least one period for {} assets",
                returns.nrows(),
                returns.ncols(),
                self.n_assets()
            )));
        }
        Ok(returns)
    }

    fn validate(&self) -> Result<(), OptimizeError> {
        let n = self.n_assets();
        if n == 0 {
            return Err(OptimizeError::InvalidInput("no assets".to_string()));
        }
        if self.covariance.dim() != (n, n) {
            return Err(OptimizeError::InvalidInput(format!(
                "covariance is {}x{}, expected {n}x{n}",
                self.covariance.nrows(),
                self.covariance.ncols()
            )));
        }
        if !self.target_return.is_finite() {
            return Err(OptimizeError::InvalidInput(format!(
                "target return must be finite, got {}",
                self.target_return
            )));
        }
        Ok(())
    }
}

/// Builds a QP from asset statistics
pub trait Formulation {
    /// The variant this formulation implements
    fn problem_type(&self) -> ProblemType;

    /// Assemble the QP
    ///
    /// # Errors
    /// Returns an error if required inputs are missing or inconsistent, or if
    /// the target cannot be reached under the constraints.
    fn build(&self, input: &FormulationInput<'_>) -> Result<QpProblem, OptimizeError>;
}

impl ProblemType {
    /// The formulation for this problem type
    pub fn formulation(&self) -> &'static dyn Formulation {
        match self {
            Self::Portfolio => &PortfolioFormulation,
            Self::Svm => &SvmFormulation,
            Self::Lqr => &LqrFormulation,
            Self::Resource => &ResourceFormulation,
        }
    }
}

/// Validate the input and assemble the QP for `problem_type`
pub fn formulate(
    problem_type: ProblemType,
    input: &FormulationInput<'_>,
) -> Result<QpProblem, OptimizeError> {
    input.validate()?;
    let problem = problem_type.formulation().build(input)?;

    debug!(
        problem = %problem_type,
        n_vars = problem.n_vars(),
        n_eq = problem.n_eq(),
        n_ineq = problem.n_ineq(),
        "formulated QP"
    );

    Ok(problem)
}

/// Append the budget row `1ᵀ w = 1` when enabled
pub(crate) fn with_budget(
    problem: QpProblem,
    constraints: &ConstraintOptions,
) -> Result<QpProblem, OptimizeError> {
    if !constraints.sum_to_one {
        return Ok(problem);
    }
    let n = problem.n_vars();
    Ok(problem.with_equality(Array2::ones((1, n)), Array1::ones(1))?)
}

/// Append long-only rows `-w <= 0` and cap rows `w <= cap` when enabled
pub(crate) fn with_bounds(
    mut problem: QpProblem,
    constraints: &ConstraintOptions,
) -> Result<QpProblem, OptimizeError> {
    let n = problem.n_vars();
    if constraints.non_negativity {
        problem = problem.with_inequality(-Array2::<f64>::eye(n), Array1::zeros(n))?;
    }
    if constraints.custom_constraints {
        let cap = constraints.position_cap(n);
        problem = problem.with_inequality(Array2::eye(n), Array1::from_elem(n, cap))?;
    }
    Ok(problem)
}

/// Scale-aware ridge: `factor * max(trace(m) / n, 1e-12)`
pub(crate) fn relative_ridge(m: &Array2<f64>, factor: f64) -> f64 {
    let n = m.nrows().max(1) as f64;
    factor * (m.diag().sum() / n).max(1e-12)
}
