//! Per-call optimization options.
//!
//! Field names serialize in camelCase so a request body from the dashboard
//! deserializes directly. Every field has a default; a partial JSON object is
//! completed with them.

use crate::error::OptimizeError;
use kktfolio_solver::{SolverConfig, SolverMethod};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Problem variant assembled from the asset statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    /// Minimum variance at a target return
    #[default]
    Portfolio,

    /// Least-squares margin classifier over return periods
    Svm,

    /// Finite-horizon linear-quadratic tracking of a return path
    Lqr,

    /// Mean-variance utility budget allocation
    Resource,
}

impl ProblemType {
    /// Returns all problem types.
    pub const fn all() -> [Self; 4] {
        [Self::Portfolio, Self::Svm, Self::Lqr, Self::Resource]
    }

    /// Returns the wire name of the problem type.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Portfolio => "portfolio",
            Self::Svm => "svm",
            Self::Lqr => "lqr",
            Self::Resource => "resource",
        }
    }

    /// Whether the formulation needs the per-period return matrix.
    pub const fn needs_returns(&self) -> bool {
        matches!(self, Self::Svm | Self::Lqr)
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProblemType {
    type Err = OptimizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| OptimizeError::InvalidConfig(format!("unknown optimization type '{s}'")))
    }
}

/// Constraint rows added to every formulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstraintOptions {
    /// Long only: w >= 0 (default: true)
    pub non_negativity: bool,

    /// Fully invested: sum of weights = 1 (default: true)
    pub sum_to_one: bool,

    /// Per-asset concentration cap (default: false)
    pub custom_constraints: bool,

    /// Cap used by `custom_constraints` (default: 0.5)
    pub max_position: f64,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            non_negativity: true,
            sum_to_one: true,
            custom_constraints: false,
            max_position: 0.5,
        }
    }
}

impl ConstraintOptions {
    /// Per-asset cap for `n` assets.
    ///
    /// With a budget row the cap is raised to at least 1/n, so the cap rows
    /// alone can never make the budget infeasible.
    pub fn position_cap(&self, n: usize) -> f64 {
        if self.sum_to_one && n > 0 {
            self.max_position.max(1.0 / n as f64)
        } else {
            self.max_position
        }
    }
}

/// KKT solver limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KktParams {
    /// Feasibility and pivot tolerance (default: 1e-8)
    pub tolerance: f64,

    /// Maximum number of KKT solves (default: 100)
    pub max_iterations: usize,
}

impl Default for KktParams {
    fn default() -> Self {
        let config = SolverConfig::default();
        Self {
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }
}

/// Everything that controls one optimization call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedOptions {
    /// Problem variant (default: portfolio)
    pub optimization_type: ProblemType,

    /// KKT factorization (default: cholesky)
    pub solver_method: SolverMethod,

    /// Shared constraint rows
    pub constraints: ConstraintOptions,

    /// Solver limits
    pub kkt_params: KktParams,
}

impl AdvancedOptions {
    /// Validate the options.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for a non-positive or non-finite tolerance, a
    /// zero iteration budget, or a non-positive position cap when caps are on.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        self.solver_config().validate()?;

        if self.constraints.custom_constraints
            && !(self.constraints.max_position.is_finite() && self.constraints.max_position > 0.0)
        {
            return Err(OptimizeError::InvalidConfig(format!(
                "maxPosition must be positive and finite, got {}",
                self.constraints.max_position
            )));
        }

        Ok(())
    }

    /// Solver configuration for these options.
    pub const fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            method: self.solver_method,
            tolerance: self.kkt_params.tolerance,
            max_iterations: self.kkt_params.max_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AdvancedOptions::default();
        assert_eq!(options.optimization_type, ProblemType::Portfolio);
        assert_eq!(options.solver_method, SolverMethod::Cholesky);
        assert!(options.constraints.non_negativity);
        assert!(options.constraints.sum_to_one);
        assert!(!options.constraints.custom_constraints);
        assert_eq!(options.constraints.max_position, 0.5);
        assert_eq!(options.kkt_params.tolerance, 1e-8);
        assert_eq!(options.kkt_params.max_iterations, 100);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_dashboard_json() {
        let json = r#"{
            "optimizationType": "svm",
            "solverMethod": "qr",
            "constraints": { "nonNegativity": false, "sumToOne": true, "customConstraints": true },
            "kktParams": { "tolerance": 1e-6, "maxIterations": 50 }
        }"#;
        let options: AdvancedOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.optimization_type, ProblemType::Svm);
        assert_eq!(options.solver_method, SolverMethod::Qr);
        assert!(!options.constraints.non_negativity);
        assert!(options.constraints.custom_constraints);
        assert_eq!(options.constraints.max_position, 0.5);
        assert_eq!(options.kkt_params.max_iterations, 50);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: AdvancedOptions = serde_json::from_str(r#"{"solverMethod": "svd"}"#).unwrap();
        assert_eq!(options.solver_method, SolverMethod::Svd);
        assert_eq!(options.constraints, ConstraintOptions::default());
        assert_eq!(options.kkt_params, KktParams::default());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&AdvancedOptions::default()).unwrap();
        assert!(json.contains("\"optimizationType\":\"portfolio\""));
        assert!(json.contains("\"solverMethod\":\"cholesky\""));
        assert!(json.contains("\"nonNegativity\":true"));
        assert!(json.contains("\"maxIterations\":100"));
    }

    #[test]
    fn test_invalid_options() {
        let mut options = AdvancedOptions::default();
        options.kkt_params.tolerance = 0.0;
        assert!(matches!(
            options.validate(),
            Err(OptimizeError::InvalidConfig(_))
        ));

        let mut options = AdvancedOptions::default();
        options.kkt_params.max_iterations = 0;
        assert!(options.validate().is_err());

        let mut options = AdvancedOptions::default();
        options.constraints.custom_constraints = true;
        options.constraints.max_position = -0.1;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_position_cap() {
        let constraints = ConstraintOptions {
            custom_constraints: true,
            max_position: 0.2,
            ..Default::default()
        };
        // Three assets at 0.2 cannot sum to one
        assert_eq!(constraints.position_cap(3), 1.0 / 3.0);
        assert_eq!(constraints.position_cap(10), 0.2);

        let no_budget = ConstraintOptions {
            sum_to_one: false,
            ..constraints
        };
        assert_eq!(no_budget.position_cap(3), 0.2);
    }

    #[test]
    fn test_problem_type_parse() {
        assert_eq!("LQR".parse::<ProblemType>().unwrap(), ProblemType::Lqr);
        assert_eq!(ProblemType::Resource.to_string(), "resource");
        assert!("qp".parse::<ProblemType>().is_err());
        assert!(ProblemType::Svm.needs_returns());
        assert!(!ProblemType::Portfolio.needs_returns());
    }
}
