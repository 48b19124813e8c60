//! Mean-variance utility budget allocation.
//!
//! Maximizes μᵀw - (γ/2) wᵀ(Σ + εI)w, i.e. minimizes (1/2) wᵀ Q w + cᵀ w with
//! Q = γ(Σ + εI) and c = -μ. The small ridge ε keeps Q positive definite when
//! Σ is singular.

use super::{Formulation, FormulationInput, relative_ridge, with_bounds, with_budget};
use crate::error::OptimizeError;
use crate::options::ProblemType;
use kktfolio_solver::QpProblem;
use ndarray::Array2;

/// Risk aversion γ
pub const RISK_AVERSION: f64 = 2.0;

/// Ridge factor relative to the average variance
pub const RESOURCE_RIDGE: f64 = 1e-8;

/// Utility-maximizing allocation formulation
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFormulation;

impl Formulation for ResourceFormulation {
    fn problem_type(&self) -> ProblemType {
        ProblemType::Resource
    }

    fn build(&self, input: &FormulationInput<'_>) -> Result<QpProblem, OptimizeError> {
        let n = input.n_assets();
        let epsilon = relative_ridge(input.covariance, RESOURCE_RIDGE);
        let q = (input.covariance + &(Array2::<f64>::eye(n) * epsilon)) * RISK_AVERSION;
        let c = -input.mean;

        let problem = QpProblem::new(q, c)?;
        let problem = with_budget(problem, input.constraints)?;
        with_bounds(problem, input.constraints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConstraintOptions;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_terms() {
        let mean = array![0.08, 0.12];
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let constraints = ConstraintOptions::default();
        let input = FormulationInput {
            mean: &mean,
            covariance: &cov,
            returns: None,
            target_return: 0.0,
            constraints: &constraints,
            tolerance: 1e-8,
        };
        let problem = ResourceFormulation.build(&input).unwrap();

        let epsilon = RESOURCE_RIDGE * 0.065;
        assert_abs_diff_eq!(problem.q()[[0, 0]], 2.0 * (0.04 + epsilon), epsilon = 1e-15);
        assert_abs_diff_eq!(problem.q()[[0, 1]], 0.02, epsilon = 1e-15);
        assert_eq!(problem.c(), &array![-0.08, -0.12]);
        assert_eq!(problem.n_eq(), 1);
    }

    #[test]
    fn test_singular_covariance_gets_ridge() {
        let mean = array![0.01, 0.01];
        let cov = Array2::<f64>::zeros((2, 2));
        let constraints = ConstraintOptions::default();
        let input = FormulationInput {
            mean: &mean,
            covariance: &cov,
            returns: None,
            target_return: 0.0,
            constraints: &constraints,
            tolerance: 1e-8,
        };
        let problem = ResourceFormulation.build(&input).unwrap();
        assert!(problem.q()[[0, 0]] > 0.0);
    }
}
