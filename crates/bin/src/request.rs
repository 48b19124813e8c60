//! JSON request files read by the CLI.
//!
//! ```json
//! {
//!   "prices": [[100.0, 50.0], [101.0, 49.5], [102.5, 50.5]],
//!   "targetReturn": 0.01,
//!   "labels": ["AAA", "BBB"],
//!   "advancedOptions": { "solverMethod": "qr" }
//! }
//! ```
//!
//! Everything but `prices` is optional.

use kktfolio::{AdvancedOptions, ProblemType, SolverMethod};
use ndarray::Array2;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading a request file
#[derive(Debug, Error)]
pub(crate) enum RequestError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File is not a valid request
    #[error("invalid request: {0}")]
    Json(#[from] serde_json::Error),

    /// No price rows or no assets
    #[error("price matrix is empty")]
    Empty,

    /// Rows of different lengths
    #[error("price row {row} has {actual} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// One optimization request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptimizeRequest {
    /// Rows are time points, columns are assets
    pub(crate) prices: Vec<Vec<f64>>,

    #[serde(default)]
    pub(crate) target_return: f64,

    #[serde(default)]
    pub(crate) labels: Option<Vec<String>>,

    #[serde(default)]
    pub(crate) advanced_options: AdvancedOptions,
}

impl OptimizeRequest {
    pub(crate) fn load(path: &Path) -> Result<Self, RequestError> {
        let text = fs::read_to_string(path).map_err(|source| RequestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Price rows as a `T x N` matrix
    pub(crate) fn price_matrix(&self) -> Result<Array2<f64>, RequestError> {
        let expected = self.prices.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(RequestError::Empty);
        }
        if let Some((row, actual)) = self
            .prices
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(RequestError::Ragged {
                row,
                expected,
                actual,
            });
        }

        let flat: Vec<f64> = self.prices.iter().flatten().copied().collect();
        Array2::from_shape_vec((self.prices.len(), expected), flat).map_err(|_| RequestError::Empty)
    }
}

/// Command-line overrides of the request's options
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Overrides {
    pub(crate) method: Option<SolverMethod>,
    pub(crate) problem: Option<ProblemType>,
    pub(crate) tolerance: Option<f64>,
    pub(crate) max_iterations: Option<usize>,
}

impl Overrides {
    pub(crate) fn apply(&self, mut options: AdvancedOptions) -> AdvancedOptions {
        if let Some(method) = self.method {
            options.solver_method = method;
        }
        if let Some(problem) = self.problem {
            options.optimization_type = problem;
        }
        if let Some(tolerance) = self.tolerance {
            options.kkt_params.tolerance = tolerance;
        }
        if let Some(max_iterations) = self.max_iterations {
            options.kkt_params.max_iterations = max_iterations;
        }
        options
    }
}
