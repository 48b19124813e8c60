//! Solver configuration
//!
//! A [`SolverConfig`] is passed by reference to every solve. Nothing in the
//! solver keeps configuration state between calls.

use crate::error::SolverError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Factorization used for the KKT system
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Partial-pivot LU of the full KKT matrix
    #[display("lu")]
    Lu,

    /// Range-space method: Cholesky of Q and of the Schur complement A Q⁻¹ Aᵀ
    #[default]
    #[display("cholesky")]
    Cholesky,

    /// Column-pivoted Householder QR of the full KKT matrix
    #[display("qr")]
    Qr,

    /// Truncated SVD (minimum-norm solution)
    #[display("svd")]
    Svd,
}

impl SolverMethod {
    /// All methods, in declaration order
    pub const ALL: [Self; 4] = [Self::Lu, Self::Cholesky, Self::Qr, Self::Svd];

    /// The method tried next when this one fails
    pub const fn fallback(self) -> Option<Self> {
        match self {
            Self::Cholesky => Some(Self::Lu),
            Self::Lu | Self::Qr => Some(Self::Svd),
            Self::Svd => None,
        }
    }
}

impl FromStr for SolverMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lu" => Ok(Self::Lu),
            "cholesky" => Ok(Self::Cholesky),
            "qr" => Ok(Self::Qr),
            "svd" => Ok(Self::Svd),
            other => Err(SolverError::InvalidConfig(format!(
                "unknown solver method '{}'",
                other
            ))),
        }
    }
}

/// Per-call solver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// KKT factorization (default: Cholesky)
    pub method: SolverMethod,

    /// Feasibility and pivot tolerance (default: 1e-8)
    pub tolerance: f64,

    /// Maximum number of KKT solves in the active-set loop (default: 100)
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            tolerance: 1e-8,
            max_iterations: 100,
        }
    }
}

impl SolverConfig {
    /// Create a configuration with the given method and default limits
    pub fn with_method(method: SolverMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Check that the tolerance is positive and finite and the iteration cap non-zero
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(SolverError::InvalidConfig(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
