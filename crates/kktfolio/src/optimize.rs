//! Optimization entry points.
//!
//! prices -> return statistics -> QP -> active-set solve -> metrics -> result.
//! Every call owns all of its working state.

use crate::error::OptimizeError;
use crate::formulation::{FormulationInput, formulate};
use crate::options::{AdvancedOptions, ProblemType};
use kktfolio_output::{
    Allocation, AssetWeight, Diagnostics, ExportError, ExportFormat, Exporter, PortfolioMetrics,
    compute_metrics, default_labels,
};
use kktfolio_risk::estimate_statistics;
use kktfolio_solver::{ActiveSetSolver, QpProblem, Solution};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of one optimization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    /// Weights, metrics, constraint status and diagnostics
    #[serde(flatten)]
    pub allocation: Allocation,

    /// The options the result was computed with
    pub advanced_options: AdvancedOptions,
}

impl OptimizationResult {
    /// Per-asset weights
    pub fn weights(&self) -> &[AssetWeight] {
        &self.allocation.weights
    }

    /// Raw weight values, in asset order
    pub fn weight_values(&self) -> Vec<f64> {
        self.allocation.weight_values()
    }

    /// Metrics of the weights
    pub const fn metrics(&self) -> &PortfolioMetrics {
        &self.allocation.metrics
    }

    /// Whether every constraint holds within tolerance
    pub const fn constraints_met(&self) -> bool {
        self.allocation.constraints_met
    }

    /// Solver diagnostics
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.allocation.diagnostics
    }

    /// Format as an ASCII table for terminal output
    pub fn to_ascii_table(&self) -> String {
        let mut output = self.allocation.to_ascii_table();
        output.push_str(&format!(
            "Problem:          {}\n",
            self.advanced_options.optimization_type
        ));
        output
    }
}

impl Exporter for OptimizationResult {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.allocation.export_to_string(format),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

/// Optimize weights for a `T x N` price matrix with default asset labels.
///
/// # Errors
/// * `InsufficientData` for fewer than two price rows
/// * `InfeasibleTargetReturn` when the target cannot be reached long-only
/// * `SingularSystem` when the KKT system cannot be solved at all
/// * `InvalidConfig` / `InvalidInput` for bad options or data
pub fn optimize(
    prices: &Array2<f64>,
    target_return: f64,
    options: &AdvancedOptions,
) -> Result<OptimizationResult, OptimizeError> {
    optimize_with_labels(prices, &default_labels(prices.ncols()), target_return, options)
}

/// Optimize weights for a price matrix whose columns carry `labels`.
///
/// # Errors
/// As [`optimize`], plus `InvalidInput` when `labels` does not match the
/// number of columns.
pub fn optimize_with_labels(
    prices: &Array2<f64>,
    labels: &[String],
    target_return: f64,
    options: &AdvancedOptions,
) -> Result<OptimizationResult, OptimizeError> {
    options.validate()?;
    let stats = estimate_statistics(prices)?;
    run(
        &stats.mean,
        &stats.covariance,
        Some(&stats.returns),
        labels,
        target_return,
        options,
    )
}

/// Optimize from pre-computed statistics.
///
/// `returns` is only needed by the svm and lqr formulations.
///
/// # Errors
/// As [`optimize`], plus `InvalidInput` when svm or lqr is requested without
/// a return matrix.
pub fn optimize_statistics(
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    returns: Option<&Array2<f64>>,
    target_return: f64,
    options: &AdvancedOptions,
) -> Result<OptimizationResult, OptimizeError> {
    options.validate()?;
    run(
        mean,
        covariance,
        returns,
        &default_labels(mean.len()),
        target_return,
        options,
    )
}

fn run(
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    returns: Option<&Array2<f64>>,
    labels: &[String],
    target_return: f64,
    options: &AdvancedOptions,
) -> Result<OptimizationResult, OptimizeError> {
    if labels.len() != mean.len() {
        return Err(OptimizeError::InvalidInput(format!(
            "{} labels for {} assets",
            labels.len(),
            mean.len()
        )));
    }

    let config = options.solver_config();
    let input = FormulationInput {
        mean,
        covariance,
        returns,
        target_return,
        constraints: &options.constraints,
        tolerance: config.tolerance,
    };
    let problem = formulate(options.optimization_type, &input)?;

    let solution = ActiveSetSolver::new(&problem, &config)?.run()?;
    let target_met = options.optimization_type != ProblemType::Portfolio
        || (mean.dot(&solution.w) - target_return).abs() <= config.tolerance;
    let constraints_met =
        solution.converged && target_met && satisfies(&problem, &solution, config.tolerance);
    debug!(
        status = %solution.status,
        method = %solution.method_used,
        iterations = solution.iterations,
        constraints_met,
        "active-set solve finished"
    );

    let metrics = compute_metrics(&solution.w, mean, covariance)?;
    info!(
        problem = %options.optimization_type,
        assets = mean.len(),
        expected_return = metrics.expected_return,
        volatility = metrics.volatility,
        "optimization complete"
    );

    let diagnostics = Diagnostics {
        iterations: solution.iterations,
        status: solution.status,
        active_constraints: solution.active_indices(),
        method_used: solution.method_used,
    };
    let weights = solution.w.to_vec();

    Ok(OptimizationResult {
        allocation: Allocation::new(labels, &weights, metrics, constraints_met, diagnostics),
        advanced_options: *options,
    })
}

/// Primal feasibility of the returned weights against the original rows
fn satisfies(problem: &QpProblem, solution: &Solution, tolerance: f64) -> bool {
    let equality_ok = problem
        .equality_residual(&solution.w)
        .iter()
        .all(|r| r.abs() <= tolerance);
    let inequality_ok = problem
        .inequality_slack(&solution.w)
        .iter()
        .all(|&v| v <= tolerance);
    equality_ok && inequality_ok
}
