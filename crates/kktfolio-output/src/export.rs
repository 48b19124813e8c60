//! Export of optimization results.
//!
//! CSV and JSON renderings of allocations and metrics. CSV writes one row per
//! asset; allocation-level fields go into `#` comment lines above the table.

use crate::allocation::{Allocation, AssetWeight};
use crate::metrics::PortfolioMetrics;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced bytes that are not UTF-8.
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn write_weights(weights: &[AssetWeight]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in weights {
        wtr.serialize(record)?;
    }
    finish(wtr)
}

impl Exporter for Vec<AssetWeight> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_weights(self),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for PortfolioMetrics {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.serialize(self)?;
                finish(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Allocation {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut output = String::new();

                output.push_str(&format!(
                    "# Expected Return: {}\n",
                    self.metrics.expected_return
                ));
                output.push_str(&format!("# Volatility: {}\n", self.metrics.volatility));
                output.push_str(&format!("# Sharpe Ratio: {}\n", self.metrics.sharpe_ratio));
                output.push_str(&format!("# Constraints Met: {}\n", self.constraints_met));
                output.push_str(&format!(
                    "# Status: {} after {} iterations\n",
                    self.diagnostics.status, self.diagnostics.iterations
                ));

                output.push_str(&write_weights(&self.weights)?);
                Ok(output)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::Diagnostics;
    use kktfolio_solver::{SolverMethod, TerminationStatus};

    fn allocation() -> Allocation {
        Allocation::new(
            &["Asset 1".to_string(), "Asset 2".to_string()],
            &[0.25, 0.75],
            PortfolioMetrics {
                expected_return: 0.11,
                volatility: 0.2,
                sharpe_ratio: 0.55,
            },
            false,
            Diagnostics {
                iterations: 100,
                status: TerminationStatus::MaxIterationsExceeded,
                active_constraints: vec![0],
                method_used: SolverMethod::Lu,
            },
        )
    }

    #[test]
    fn test_allocation_csv() {
        let csv = allocation().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().filter(|l| !l.starts_with('#')).collect();

        assert_eq!(lines[0], "asset,weight,color");
        assert_eq!(lines[1], "Asset 1,0.25,#2e4328");
        assert_eq!(lines[2], "Asset 2,0.75,#426039");
        assert!(csv.contains("# Constraints Met: false"));
        assert!(csv.contains("# Status: maxIterationsExceeded after 100 iterations"));
    }

    #[test]
    fn test_allocation_json() {
        let json = allocation().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"weights\""));
        assert!(json.contains("\"constraintsMet\":false"));
        assert!(json.contains("\"status\":\"maxIterationsExceeded\""));

        let back: Allocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, allocation());
    }

    #[test]
    fn test_allocation_pretty_json() {
        let json = allocation()
            .export_to_string(ExportFormat::PrettyJson)
            .unwrap();
        assert!(json.contains("\"Asset 1\""));
        assert!(json.contains("  ")); // Indentation indicates pretty format
    }

    #[test]
    fn test_weights_csv() {
        let csv = allocation()
            .weights
            .export_to_string(ExportFormat::Csv)
            .unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_metrics_csv() {
        let csv = allocation()
            .metrics
            .export_to_string(ExportFormat::Csv)
            .unwrap();
        assert!(csv.starts_with("expectedReturn,volatility,sharpeRatio"));
        assert!(csv.contains("0.11,0.2,0.55"));
    }

    #[test]
    fn test_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join("kktfolio_export_test.csv");
        allocation()
            .export_to_file(&path, ExportFormat::Csv)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Asset 2,0.75"));
        std::fs::remove_file(&path).ok();
    }
}
