//! Minimum-variance portfolio at a target return.
//!
//! ```text
//! minimize     1/2 wᵀ Σ w
//! subject to   1ᵀ w = 1         (sum_to_one)
//!              μᵀ w = target
//!              shared bound rows
//! ```
//!
//! The target row is always enforced. It is only left out of the QP when it
//! is implied by the other rows: equal means (within tolerance) under the
//! budget row, or an all-zero mean vector. The target must then equal the
//! return those rows already fix, or the build fails with
//! `InfeasibleTargetReturn`.

use super::{Formulation, FormulationInput, with_bounds, with_budget};
use crate::error::OptimizeError;
use crate::options::ProblemType;
use kktfolio_solver::QpProblem;
use kktfolio_solver::factorization::{CholeskyFactor, Factorization};
use ndarray::{Array1, Array2, Axis};

/// Markowitz minimum-variance formulation
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioFormulation;

/// Range of the mean vector
pub(crate) fn mean_range(mean: &Array1<f64>) -> (f64, f64) {
    mean.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &m| {
        (lo.min(m), hi.max(m))
    })
}

impl Formulation for PortfolioFormulation {
    fn problem_type(&self) -> ProblemType {
        ProblemType::Portfolio
    }

    fn build(&self, input: &FormulationInput<'_>) -> Result<QpProblem, OptimizeError> {
        let n = input.n_assets();
        let (min, max) = mean_range(input.mean);
        let target = input.target_return;
        let tolerance = input.tolerance;
        let constraints = input.constraints;
        let infeasible = || OptimizeError::InfeasibleTargetReturn { target, min, max };

        // Return fixed by the other rows, if any: every budgeted portfolio
        // earns the common mean, and a zero mean row earns nothing
        let implied = if constraints.sum_to_one && max - min <= tolerance {
            Some((min + max) / 2.0)
        } else if min.abs().max(max.abs()) <= tolerance {
            Some(0.0)
        } else {
            None
        };

        if let Some(fixed) = implied {
            if (target - fixed).abs() > tolerance {
                return Err(infeasible());
            }
        } else if constraints.non_negativity
            && constraints.sum_to_one
            && (target < min - tolerance || target > max + tolerance)
        {
            // Long-only and fully invested: reachable returns are exactly [min, max]
            return Err(infeasible());
        }

        let mut problem = QpProblem::new(input.covariance.clone(), Array1::zeros(n))?;
        problem = with_budget(problem, constraints)?;
        if implied.is_none() {
            let row = input.mean.clone().insert_axis(Axis(0));
            problem = problem.with_equality(row, Array1::from_elem(1, target))?;
        }
        with_bounds(problem, constraints)
    }
}

/// Closed-form minimum-variance weights Σ⁻¹1 / (1ᵀΣ⁻¹1), for reference checks
pub fn min_variance_closed_form(covariance: &Array2<f64>) -> Option<Array1<f64>> {
    let n = covariance.nrows();
    let factor = CholeskyFactor::factorize(covariance, 1e-12).ok()?;
    let x = factor.solve(&Array1::ones(n));
    let total = x.sum();
    (total != 0.0).then(|| x / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::test_support::fixture;
    use crate::options::ConstraintOptions;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::rstest;

    fn input<'a>(
        mean: &'a Array1<f64>,
        covariance: &'a Array2<f64>,
        target_return: f64,
        constraints: &'a ConstraintOptions,
    ) -> FormulationInput<'a> {
        FormulationInput {
            mean,
            covariance,
            returns: None,
            target_return,
            constraints,
            tolerance: 1e-8,
        }
    }

    #[test]
    fn test_rows() {
        let mean = array![0.08, 0.12];
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let constraints = ConstraintOptions::default();
        let problem = PortfolioFormulation
            .build(&input(&mean, &cov, 0.10, &constraints))
            .unwrap();

        assert_eq!(problem.q(), &cov);
        assert_eq!(problem.c(), &Array1::<f64>::zeros(2));
        assert_eq!(problem.n_eq(), 2);
        assert_eq!(problem.a().row(1).to_vec(), vec![0.08, 0.12]);
        assert_eq!(problem.b()[1], 0.10);
        assert_eq!(problem.n_ineq(), 2);
    }

    #[test]
    fn test_target_row_omitted_only_when_implied() {
        let mean = array![0.05, 0.05];
        let cov = array![[0.04, 0.0], [0.0, 0.09]];
        let constraints = ConstraintOptions::default();
        let problem = PortfolioFormulation
            .build(&input(&mean, &cov, 0.05, &constraints))
            .unwrap();
        assert_eq!(problem.n_eq(), 1);

        // Without the budget row equal means still steer the total weight
        let free = ConstraintOptions {
            sum_to_one: false,
            non_negativity: false,
            ..Default::default()
        };
        let problem = PortfolioFormulation
            .build(&input(&mean, &cov, 0.2, &free))
            .unwrap();
        assert_eq!(problem.n_eq(), 1);
        assert_eq!(problem.a().row(0).to_vec(), vec![0.05, 0.05]);
        assert_eq!(problem.b()[0], 0.2);
    }

    #[rstest]
    #[case::equal_means(array![0.05, 0.05], 0.2)]
    #[case::equal_means_below(array![0.05, 0.05], 0.0)]
    #[case::single_asset(array![0.01], 0.3)]
    fn test_unreachable_target_without_dispersion(
        #[case] mean: Array1<f64>,
        #[case] target: f64,
    ) {
        let cov = Array2::<f64>::eye(mean.len()) * 0.04;
        for non_negativity in [true, false] {
            let constraints = ConstraintOptions {
                non_negativity,
                ..Default::default()
            };
            let result = PortfolioFormulation.build(&input(&mean, &cov, target, &constraints));
            assert!(
                matches!(result, Err(OptimizeError::InfeasibleTargetReturn { .. })),
                "non_negativity = {non_negativity}: {result:?}"
            );
        }
    }

    #[test]
    fn test_single_asset_at_its_mean() {
        let constraints = ConstraintOptions::default();
        let problem = PortfolioFormulation
            .build(&input(&array![0.01], &array![[0.0004]], 0.01, &constraints))
            .unwrap();
        assert_eq!(problem.n_eq(), 1);
    }

    #[test]
    fn test_zero_means_need_zero_target() {
        let mean = array![0.0, 0.0];
        let cov = array![[0.04, 0.0], [0.0, 0.09]];
        let free = ConstraintOptions {
            sum_to_one: false,
            non_negativity: false,
            ..Default::default()
        };
        let problem = PortfolioFormulation
            .build(&input(&mean, &cov, 0.0, &free))
            .unwrap();
        assert_eq!(problem.n_eq(), 0);

        let result = PortfolioFormulation.build(&input(&mean, &cov, 0.01, &free));
        assert!(matches!(
            result,
            Err(OptimizeError::InfeasibleTargetReturn { .. })
        ));
    }

    #[test]
    fn test_infeasible_target() {
        let mean = array![0.08, 0.12];
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let constraints = ConstraintOptions::default();
        let result = PortfolioFormulation.build(&input(&mean, &cov, 0.15, &constraints));

        match result {
            Err(OptimizeError::InfeasibleTargetReturn { target, min, max }) => {
                assert_eq!(target, 0.15);
                assert_eq!(min, 0.08);
                assert_eq!(max, 0.12);
            }
            other => panic!("expected InfeasibleTargetReturn, got {other:?}"),
        }
    }

    #[test]
    fn test_leverage_allows_any_target() {
        let mean = array![0.08, 0.12];
        let cov = array![[0.04, 0.01], [0.01, 0.09]];
        let constraints = ConstraintOptions {
            non_negativity: false,
            ..Default::default()
        };
        assert!(
            PortfolioFormulation
                .build(&input(&mean, &cov, 0.15, &constraints))
                .is_ok()
        );
    }

    #[test]
    fn test_closed_form() {
        let f = fixture();
        let w = min_variance_closed_form(&f.covariance).unwrap();
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-12);

        let w = min_variance_closed_form(&array![[0.04, 0.01], [0.01, 0.09]]).unwrap();
        assert_abs_diff_eq!(w[0], 8.0 / 11.0, epsilon = 1e-12);
        assert!(min_variance_closed_form(&array![[1.0, 1.0], [1.0, 1.0]]).is_none());
    }

    #[test]
    fn test_mean_range() {
        assert_eq!(mean_range(&array![0.1, -0.2, 0.05]), (-0.2, 0.1));
    }
}
