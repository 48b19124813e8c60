//! Portfolio metrics
//!
//! Expected return, volatility and risk-adjusted ratio of a weight vector,
//! computed from the same mean vector and covariance matrix the optimizer saw.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from metric computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// Weights, mean and covariance disagree on the number of assets
    #[error("Dimension mismatch: {weights} weights, {mean} means, {rows}x{cols} covariance")]
    DimensionMismatch {
        /// Length of the weight vector
        weights: usize,
        /// Length of the mean vector
        mean: usize,
        /// Covariance rows
        rows: usize,
        /// Covariance columns
        cols: usize,
    },
}

/// Summary metrics of an allocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    /// mean · w
    pub expected_return: f64,

    /// sqrt(wᵀ Σ w), never negative
    pub volatility: f64,

    /// expected_return / volatility; +∞ when volatility is exactly zero.
    /// Serialized as `null` in JSON when infinite.
    #[serde(
        serialize_with = "serialize_ratio",
        deserialize_with = "deserialize_ratio"
    )]
    pub sharpe_ratio: f64,
}

impl PortfolioMetrics {
    /// Whether the risk-adjusted ratio is finite
    pub const fn has_finite_ratio(&self) -> bool {
        self.sharpe_ratio.is_finite()
    }
}

/// Compute metrics for weights `w`
///
/// # Errors
/// Returns `DimensionMismatch` if the inputs disagree on the number of assets.
pub fn compute_metrics(
    w: &Array1<f64>,
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
) -> Result<PortfolioMetrics, MetricsError> {
    let n = w.len();
    if mean.len() != n || covariance.nrows() != n || covariance.ncols() != n {
        return Err(MetricsError::DimensionMismatch {
            weights: n,
            mean: mean.len(),
            rows: covariance.nrows(),
            cols: covariance.ncols(),
        });
    }

    let expected_return = mean.dot(w);
    // Roundoff can push a zero variance slightly negative
    let variance = w.dot(&covariance.dot(w)).max(0.0);
    let volatility = variance.sqrt();
    let sharpe_ratio = if volatility == 0.0 {
        f64::INFINITY
    } else {
        expected_return / volatility
    };

    Ok(PortfolioMetrics {
        expected_return,
        volatility,
        sharpe_ratio,
    })
}

fn serialize_ratio<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_ratio<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}
