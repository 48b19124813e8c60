//! Price-to-return conversion
//!
//! Converts a `T x N` price matrix into `T - 1` rows of simple returns
//! r_t = (p_t - p_{t-1}) / p_{t-1}, then summarizes them into a per-asset
//! mean vector and a sample covariance matrix.

use crate::covariance::{
    CovarianceError, CovarianceEstimator, SampleCovarianceEstimator, zero_variance_assets,
};
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

/// Minimum number of price rows needed to form one return
pub const MIN_PRICE_OBSERVATIONS: usize = 2;

/// Summary statistics of an asset return history
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatistics {
    /// Per-period simple returns ((T-1) x N)
    pub returns: Array2<f64>,
    /// Arithmetic mean return per asset (N)
    pub mean: Array1<f64>,
    /// Unbiased sample covariance (N x N)
    pub covariance: Array2<f64>,
}

impl ReturnStatistics {
    /// Number of assets
    pub fn n_assets(&self) -> usize {
        self.mean.len()
    }

    /// Number of return periods
    pub fn n_periods(&self) -> usize {
        self.returns.nrows()
    }
}

/// Compute per-period simple returns from a price matrix
///
/// # Arguments
/// * `prices` - Matrix where each row is a time point (chronological) and each column an asset
///
/// # Errors
/// * `InsufficientData` when fewer than two time points are given
/// * `InvalidPrice` when a base price is not finite or not strictly positive
pub fn simple_returns(prices: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
    let (n_times, n_assets) = prices.dim();
    if n_times < MIN_PRICE_OBSERVATIONS {
        return Err(CovarianceError::InsufficientData {
            required: MIN_PRICE_OBSERVATIONS,
            actual: n_times,
        });
    }
    if n_assets == 0 {
        return Err(CovarianceError::InvalidParameter(
            "price matrix has no assets".to_string(),
        ));
    }

    let mut returns = Array2::<f64>::zeros((n_times - 1, n_assets));
    for t in 1..n_times {
        for j in 0..n_assets {
            let previous = prices[[t - 1, j]];
            if !previous.is_finite() || previous <= 0.0 {
                return Err(CovarianceError::InvalidPrice {
                    row: t - 1,
                    column: j,
                    price: previous,
                });
            }
            let current = prices[[t, j]];
            if !current.is_finite() {
                return Err(CovarianceError::InvalidPrice {
                    row: t,
                    column: j,
                    price: current,
                });
            }
            returns[[t - 1, j]] = (current - previous) / previous;
        }
    }

    Ok(returns)
}

/// Estimate returns, mean vector and sample covariance from prices
pub fn estimate_statistics(prices: &Array2<f64>) -> Result<ReturnStatistics, CovarianceError> {
    let returns = simple_returns(prices)?;
    let mean = returns
        .mean_axis(Axis(0))
        .ok_or(CovarianceError::InsufficientData {
            required: MIN_PRICE_OBSERVATIONS,
            actual: prices.nrows(),
        })?;
    let covariance = SampleCovarianceEstimator::default().estimate(&returns)?;

    let flat = zero_variance_assets(&covariance, 0.0);
    debug!(
        periods = returns.nrows(),
        assets = returns.ncols(),
        zero_variance = ?flat,
        "estimated return statistics"
    );

    Ok(ReturnStatistics {
        returns,
        mean,
        covariance,
    })
}
