//! Solver error types

use thiserror::Error;

/// Errors that can occur while building or solving a quadratic program
#[derive(Debug, Error)]
pub enum SolverError {
    /// Even the SVD fallback could not satisfy the KKT system
    #[error("KKT system is singular: residual {residual:e} exceeds {threshold:e}")]
    SingularSystem {
        /// Infinity norm of the final residual
        residual: f64,
        /// Largest residual that would have been accepted
        threshold: f64,
    },

    /// Dimension mismatch between problem components
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which component was checked
        context: &'static str,
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A problem component contains NaN or infinity
    #[error("Non-finite value in {0}")]
    NonFinite(&'static str),

    /// Invalid solver configuration
    #[error("Invalid solver configuration: {0}")]
    InvalidConfig(String),
}
