//! Allocation records
//!
//! The record handed back to the dashboard: one labelled, coloured weight per
//! asset, the metrics of the allocation and how the solver got there.

use crate::metrics::PortfolioMetrics;
use kktfolio_solver::{SolverMethod, TerminationStatus};
use serde::{Deserialize, Serialize};

/// Display colours, cycled by asset index
pub const PALETTE: [&str; 8] = [
    "#2e4328", "#426039", "#a2c398", "#ffd43b", "#ff6b6b", "#4dabf7", "#845ef7", "#f783ac",
];

/// Colour for the asset at `index`
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Labels `Asset 1` through `Asset n`
pub fn default_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Asset {}", i)).collect()
}

/// Weight of a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
    /// Asset label
    pub asset: String,

    /// Portfolio weight
    pub weight: f64,

    /// Display colour (hex)
    pub color: String,
}

impl AssetWeight {
    /// Create a weight entry coloured by the asset's position
    pub fn new(index: usize, asset: impl Into<String>, weight: f64) -> Self {
        Self {
            asset: asset.into(),
            weight,
            color: palette_color(index).to_string(),
        }
    }
}

/// Solver diagnostics attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Number of KKT solves
    pub iterations: usize,

    /// How the active-set loop ended
    pub status: TerminationStatus,

    /// Indices of the inequality rows active at the returned weights
    pub active_constraints: Vec<usize>,

    /// Factorization that produced the returned weights
    pub method_used: SolverMethod,
}

/// Weights, metrics and solver status of one optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Per-asset weights, in input column order
    pub weights: Vec<AssetWeight>,

    /// Metrics of the weights against the input statistics
    pub metrics: PortfolioMetrics,

    /// Whether every constraint holds within tolerance
    pub constraints_met: bool,

    /// Solver diagnostics
    pub diagnostics: Diagnostics,
}

impl Allocation {
    /// Pair labels with weights; labels and weights must have equal length
    pub fn new(
        labels: &[String],
        weights: &[f64],
        metrics: PortfolioMetrics,
        constraints_met: bool,
        diagnostics: Diagnostics,
    ) -> Self {
        let weights = labels
            .iter()
            .zip(weights)
            .enumerate()
            .map(|(i, (label, &w))| AssetWeight::new(i, label.clone(), w))
            .collect();

        Self {
            weights,
            metrics,
            constraints_met,
            diagnostics,
        }
    }

    /// Raw weight values, in asset order
    pub fn weight_values(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w.weight).collect()
    }

    /// Sum of the weights
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().map(|w| w.weight).sum()
    }

    /// Format as an ASCII table for terminal output
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nOptimal Allocation\n");
        output.push_str(&"=".repeat(60));
        output.push('\n');

        output.push_str(&format!(
            "{:<24} {:>12} {:>10} {:>10}\n",
            "Asset", "Weight", "% Alloc", "Color"
        ));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        for w in &self.weights {
            output.push_str(&format!(
                "{:<24} {:>12.6} {:>9.2}% {:>10}\n",
                w.asset,
                w.weight,
                w.weight * 100.0,
                w.color
            ));
        }

        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!("{:<24} {:>12.6}\n", "Total", self.total_weight()));
        output.push_str(&"=".repeat(60));
        output.push('\n');

        output.push_str(&format!(
            "Expected Return:  {:>10.4}%\n",
            self.metrics.expected_return * 100.0
        ));
        output.push_str(&format!(
            "Volatility:       {:>10.4}%\n",
            self.metrics.volatility * 100.0
        ));
        if self.metrics.has_finite_ratio() {
            output.push_str(&format!(
                "Sharpe Ratio:     {:>10.4}\n",
                self.metrics.sharpe_ratio
            ));
        } else {
            output.push_str(&format!("Sharpe Ratio:     {:>10}\n", "inf"));
        }
        output.push_str(&format!(
            "Constraints Met:  {:>10}\n",
            if self.constraints_met { "yes" } else { "no" }
        ));
        output.push_str(&format!(
            "Solver:           {} ({}, {} iterations)\n",
            self.diagnostics.method_used, self.diagnostics.status, self.diagnostics.iterations
        ));

        output
    }

    /// Format as a Markdown table
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Optimal Allocation\n\n");
        output.push_str("| Asset | Weight |\n");
        output.push_str("|-------|--------|\n");
        for w in &self.weights {
            output.push_str(&format!("| {} | {:.4} |\n", w.asset, w.weight));
        }
        output.push('\n');

        output.push_str("## Metrics\n\n");
        output.push_str(&format!(
            "- **Expected Return:** {:.2}%\n",
            self.metrics.expected_return * 100.0
        ));
        output.push_str(&format!(
            "- **Volatility:** {:.2}%\n",
            self.metrics.volatility * 100.0
        ));
        output.push_str(&format!(
            "- **Sharpe Ratio:** {:.4}\n",
            self.metrics.sharpe_ratio
        ));
        output.push_str(&format!(
            "- **Constraints Met:** {}\n",
            self.constraints_met
        ));

        output
    }
}
