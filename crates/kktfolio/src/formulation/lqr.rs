//! Condensed finite-horizon linear-quadratic tracking.
//!
//! The state after k periods is the portfolio's cumulative return minus the
//! cumulative target, x_k = S_kᵀ w - k·target, where S_k is the running sum of
//! the first k return rows. Weights are a static control held over the
//! horizon, chosen to keep the state near zero:
//!
//! ```text
//! minimize  (1/n) Σ_k x_k² + ρ |w|²
//! ```
//!
//! Expanding with M = (1/n) Σ_k S_k S_kᵀ gives Q = 2M + 2ρI and
//! c = -(2/n) Σ_k k·target·S_k.

use super::{Formulation, FormulationInput, relative_ridge, with_bounds, with_budget};
use crate::error::OptimizeError;
use crate::options::ProblemType;
use kktfolio_solver::QpProblem;
use ndarray::{Array1, Array2, Axis};

/// Control penalty relative to the average diagonal of M
pub const LQR_CONTROL_PENALTY: f64 = 1e-3;

/// Linear-quadratic tracking formulation
#[derive(Debug, Clone, Copy, Default)]
pub struct LqrFormulation;

/// Running sums of the return rows; row k-1 holds S_k
pub fn cumulative_returns(returns: &Array2<f64>) -> Array2<f64> {
    let mut cumulative = returns.clone();
    cumulative.accumulate_axis_inplace(Axis(0), |&prev, curr| *curr += prev);
    cumulative
}

impl Formulation for LqrFormulation {
    fn problem_type(&self) -> ProblemType {
        ProblemType::Lqr
    }

    fn build(&self, input: &FormulationInput<'_>) -> Result<QpProblem, OptimizeError> {
        let returns = input.require_returns(ProblemType::Lqr)?;
        let horizon = returns.nrows();
        let n = input.n_assets();
        let scale = horizon as f64;

        let states = cumulative_returns(returns);
        let m = states.t().dot(&states) / scale;
        let rho = relative_ridge(&m, LQR_CONTROL_PENALTY);

        // Σ_k k·target·S_k
        let steps = Array1::from_shape_fn(horizon, |k| (k + 1) as f64 * input.target_return);
        let drift = states.t().dot(&steps);

        let q = (m + Array2::<f64>::eye(n) * rho) * 2.0;
        let c = drift * (-2.0 / scale);

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
    fn test_cumulative_returns() {
        let r = array![[0.1, 0.0], [0.2, -0.1], [-0.1, 0.3]];
        let s = cumulative_returns(&r);
        assert_abs_diff_eq!(s[[2, 0]], 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(s[[2, 1]], 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(s[[1, 0]], 0.3, epsilon = 1e-15);
    }

    #[test]
    fn test_single_asset_terms() {
        // One asset, returns 0.1 then 0.2: S = (0.1, 0.3)
        let returns = array![[0.1], [0.2]];
        let mean = array![0.15];
        let cov = array![[0.005]];
        let constraints = ConstraintOptions {
            sum_to_one: false,
            non_negativity: false,
            ..Default::default()
        };
        let input = FormulationInput {
            mean: &mean,
            covariance: &cov,
            returns: Some(&returns),
            target_return: 0.1,
            constraints: &constraints,
            tolerance: 1e-8,
        };
        let problem = LqrFormulation.build(&input).unwrap();

        // M = (0.01 + 0.09) / 2 = 0.05, ρ = 5e-5
        assert_abs_diff_eq!(problem.q()[[0, 0]], 2.0 * (0.05 + 5e-5), epsilon = 1e-15);
        // c = -(2/2) (1·0.1·0.1 + 2·0.1·0.3) = -0.07
        assert_abs_diff_eq!(problem.c()[0], -0.07, epsilon = 1e-15);
        assert_eq!(problem.n_eq(), 0);
        assert_eq!(problem.n_ineq(), 0);
    }

    #[test]
    fn test_zero_target_has_no_linear_term() {
        let returns = array![[0.01, 0.02], [0.03, -0.01]];
        let mean = array![0.02, 0.005];
        let cov = array![[0.0002, -0.0003], [-0.0003, 0.00045]];
        let constraints = ConstraintOptions::default();
        let input = FormulationInput {
            mean: &mean,
            covariance: &cov,
            returns: Some(&returns),
            target_return: 0.0,
            constraints: &constraints,
            tolerance: 1e-8,
        };
        let problem = LqrFormulation.build(&input).unwrap();
        assert!(problem.c().iter().all(|&v| v == 0.0));
    }
}
