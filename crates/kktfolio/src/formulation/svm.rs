//! Least-squares margin classifier over return periods.
//!
//! Each period t is a sample r_t (the asset returns in that period) labelled
//! y_t = +1 when the equal-weighted return is non-negative and -1 otherwise.
//! The weights are the regularized least-squares classifier
//!
//! ```text
//! minimize  (1/2n) Σ_t (y_t - r_tᵀ w)² + (ρ/2) |w|²
//! ```
//!
//! which, dropping the constant, is Q = RᵀR/n + ρI and c = -Rᵀy/n. The ridge
//! ρ scales with the average diagonal of RᵀR/n so it stays meaningful for
//! daily as well as annual returns.

use super::{Formulation, FormulationInput, relative_ridge, with_bounds, with_budget};
use crate::error::OptimizeError;
use crate::options::ProblemType;
use kktfolio_solver::QpProblem;
use ndarray::{Array1, Array2, Axis};

/// Ridge factor relative to the average second moment
pub const SVM_RIDGE: f64 = 1e-2;

/// Margin-classifier formulation
#[derive(Debug, Clone, Copy, Default)]
pub struct SvmFormulation;

/// Labels from the sign of each period's equal-weighted return
pub fn period_labels(returns: &Array2<f64>) -> Array1<f64> {
    returns
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(returns.nrows()))
        .mapv(|r| if r >= 0.0 { 1.0 } else { -1.0 })
}

impl Formulation for SvmFormulation {
    fn problem_type(&self) -> ProblemType {
        ProblemType::Svm
    }

    fn build(&self, input: &FormulationInput<'_>) -> Result<QpProblem, OptimizeError> {
        let returns = input.require_returns(ProblemType::Svm)?;
        let n_periods = returns.nrows() as f64;
        let n = input.n_assets();

        let labels = period_labels(returns);
        let gram = returns.t().dot(returns) / n_periods;
        let rho = relative_ridge(&gram, SVM_RIDGE);

        let q = gram + Array2::<f64>::eye(n) * rho;
        let c = -returns.t().dot(&labels) / n_periods;

        let problem = QpProblem::new(q, c)?;
        let problem = with_budget(problem, input.constraints)?;
        with_bounds(problem, input.constraints)
    }
}
