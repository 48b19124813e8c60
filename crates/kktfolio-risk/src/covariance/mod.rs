//! Asset covariance estimation
//!
//! Provides the sample covariance estimator used to build the objective
//! matrix of minimum-variance problems, plus a few matrix diagnostics.

pub mod sample;
pub mod utils;

pub use sample::{SampleCovarianceConfig, SampleCovarianceEstimator};
pub use utils::{is_symmetric, symmetrize, zero_variance_assets};

use ndarray::Array2;
use thiserror::Error;

/// Errors that can occur during return and covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// A price that cannot be used as the base of a return
    #[error("Invalid price {price} at row {row}, column {column}")]
    InvalidPrice {
        /// Time index of the offending price
        row: usize,
        /// Asset index of the offending price
        column: usize,
        /// The price itself
        price: f64,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from asset returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a period and each column is an asset
    ///
    /// # Returns
    /// * Estimated covariance matrix (N x N where N is number of assets)
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;
}
