#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kktfolio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod allocation;
pub mod export;
pub mod metrics;

pub use allocation::{Allocation, AssetWeight, Diagnostics, PALETTE, default_labels, palette_color};
pub use export::{ExportError, ExportFormat, Exporter};
pub use metrics::{MetricsError, PortfolioMetrics, compute_metrics};
