//! Sample Covariance Estimator
//!
//! The unbiased sample covariance between assets i and j over n return
//! periods is:
//! Cov(i,j) = Σ_t (r_{t,i} - μ_i)(r_{t,j} - μ_j) / (n - 1)
//!
//! With a single return period the divisor is clamped to 1. Every deviation
//! is zero in that case, so the estimate is the zero matrix.

use super::{CovarianceError, CovarianceEstimator};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Sample covariance estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleCovarianceConfig {
    /// Minimum number of return periods required (default: 1)
    pub min_observations: usize,

    /// Divide by n - 1 instead of n (default: true)
    pub bias_correction: bool,
}

impl Default for SampleCovarianceConfig {
    fn default() -> Self {
        Self {
            min_observations: 1,
            bias_correction: true,
        }
    }
}

/// Equally weighted sample covariance estimator
#[derive(Debug, Default)]
pub struct SampleCovarianceEstimator {
    config: SampleCovarianceConfig,
}

impl SampleCovarianceEstimator {
    /// Create a new estimator with the given configuration
    pub fn new(config: SampleCovarianceConfig) -> Result<Self, CovarianceError> {
        if config.min_observations == 0 {
            return Err(CovarianceError::InvalidParameter(
                "min_observations must be at least 1".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Divisor applied to the cross-product sums for `n` periods
    fn divisor(&self, n_periods: usize) -> f64 {
        let n = if self.config.bias_correction {
            n_periods.saturating_sub(1)
        } else {
            n_periods
        };
        n.max(1) as f64
    }
}

impl CovarianceEstimator for SampleCovarianceEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let (n_periods, n_assets) = returns.dim();

        if n_periods < self.config.min_observations {
            return Err(CovarianceError::InsufficientData {
                required: self.config.min_observations,
                actual: n_periods,
            });
        }
        if n_assets == 0 {
            return Err(CovarianceError::InvalidParameter(
                "return matrix has no assets".to_string(),
            ));
        }

        let means = returns
            .mean_axis(Axis(0))
            .ok_or(CovarianceError::InsufficientData {
                required: 1,
                actual: 0,
            })?;
        let centered = returns - &means.insert_axis(Axis(0));
        let divisor = self.divisor(n_periods);

        // Fill the upper triangle and mirror it so the result is exactly symmetric
        let mut cov = Array2::<f64>::zeros((n_assets, n_assets));
        for i in 0..n_assets {
            let col_i = centered.column(i);
            for j in i..n_assets {
                let value = col_i.dot(&centered.column(j)) / divisor;
                cov[[i, j]] = value;
                cov[[j, i]] = value;
            }
        }

        Ok(cov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_sample_config_default() {
        let config = SampleCovarianceConfig::default();
        assert_eq!(config.min_observations, 1);
        assert!(config.bias_correction);
    }

    #[test]
    fn test_invalid_min_observations() {
        let config = SampleCovarianceConfig {
            min_observations: 0,
            ..Default::default()
        };
        assert!(SampleCovarianceEstimator::new(config).is_err());
    }

    #[test]
    fn test_unbiased_two_asset() {
        let returns = array![[0.01, 0.02], [0.03, -0.01], [-0.01, 0.00], [0.01, 0.03]];
        let cov = SampleCovarianceEstimator::default()
            .estimate(&returns)
            .unwrap();

        // Means: 0.01 and 0.01; deviations computed by hand
        let var_0 = (0.0 + 0.0004 + 0.0004 + 0.0) / 3.0;
        let var_1 = (0.0001 + 0.0004 + 0.0001 + 0.0004) / 3.0;
        let cov_01 = (0.0 * 0.01 + 0.02 * -0.02 + -0.02 * -0.01 + 0.0 * 0.02) / 3.0;

        assert_abs_diff_eq!(cov[[0, 0]], var_0, epsilon = 1e-15);
        assert_abs_diff_eq!(cov[[1, 1]], var_1, epsilon = 1e-15);
        assert_abs_diff_eq!(cov[[0, 1]], cov_01, epsilon = 1e-15);
        assert_eq!(cov[[0, 1]], cov[[1, 0]]);
    }

    #[test]
    fn test_biased_divisor() {
        let returns = array![[1.0], [3.0]];
        let estimator = SampleCovarianceEstimator::new(SampleCovarianceConfig {
            bias_correction: false,
            ..Default::default()
        })
        .unwrap();
        let cov = estimator.estimate(&returns).unwrap();
        assert_abs_diff_eq!(cov[[0, 0]], 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_single_period_is_zero_matrix() {
        let returns = array![[0.05, -0.02, 0.01]];
        let cov = SampleCovarianceEstimator::default()
            .estimate(&returns)
            .unwrap();
        assert!(cov.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constant_column_has_zero_row() {
        let returns = array![[0.0, 0.01], [0.0, -0.02], [0.0, 0.03]];
        let cov = SampleCovarianceEstimator::default()
            .estimate(&returns)
            .unwrap();
        assert_eq!(cov[[0, 0]], 0.0);
        assert_eq!(cov[[0, 1]], 0.0);
        assert!(cov[[1, 1]] > 0.0);
    }

    #[test]
    fn test_empty_returns_rejected() {
        let returns = Array2::<f64>::zeros((0, 3));
        let result = SampleCovarianceEstimator::default().estimate(&returns);
        assert!(matches!(
            result,
            Err(CovarianceError::InsufficientData { .. })
        ));
    }
}
