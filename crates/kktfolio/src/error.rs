//! Errors surfaced by the optimization entry points.

use kktfolio_output::MetricsError;
use kktfolio_risk::CovarianceError;
use kktfolio_solver::SolverError;
use thiserror::Error;

/// Errors that can occur while optimizing an allocation.
///
/// Hitting the iteration limit is not an error: the result then reports
/// `constraints_met = false` with the best iterate found.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Fewer price rows than needed to form a return
    #[error("Insufficient data: need at least {required} time points, got {actual}")]
    InsufficientData {
        /// Required number of time points
        required: usize,
        /// Number of time points supplied
        actual: usize,
    },

    /// Target return outside what the constraints allow
    #[error("Target return {target} is outside the achievable range [{min}, {max}]")]
    InfeasibleTargetReturn {
        /// Requested target
        target: f64,
        /// Smallest achievable expected return
        min: f64,
        /// Largest achievable expected return
        max: f64,
    },

    /// KKT system could not be solved even by the SVD fallback
    #[error("KKT system is singular: residual {residual:e} exceeds {threshold:e}")]
    SingularSystem {
        /// Infinity norm of the final residual
        residual: f64,
        /// Largest residual that would have been accepted
        threshold: f64,
    },

    /// Malformed input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid options
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Other return or covariance estimation failure
    #[error("Estimation error: {0}")]
    Covariance(CovarianceError),

    /// Other solver failure
    #[error("Solver error: {0}")]
    Solver(SolverError),

    /// Metric computation failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

impl From<CovarianceError> for OptimizeError {
    fn from(e: CovarianceError) -> Self {
        match e {
            CovarianceError::InsufficientData { required, actual } => {
                Self::InsufficientData { required, actual }
            }
            CovarianceError::InvalidPrice { .. } | CovarianceError::DimensionMismatch { .. } => {
                Self::InvalidInput(e.to_string())
            }
            other => Self::Covariance(other),
        }
    }
}

impl From<SolverError> for OptimizeError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::SingularSystem {
                residual,
                threshold,
            } => Self::SingularSystem {
                residual,
                threshold,
            },
            SolverError::InvalidConfig(msg) => Self::InvalidConfig(msg),
            other => Self::Solver(other),
        }
    }
}
