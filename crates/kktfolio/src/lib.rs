#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kktfolio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod formulation;
pub mod optimize;
pub mod options;

// Re-export main types from sub-crates
pub use kktfolio_output as output;
pub use kktfolio_risk as risk;
pub use kktfolio_solver as solver;

pub use error::OptimizeError;
pub use formulation::{Formulation, FormulationInput, formulate};
pub use optimize::{OptimizationResult, optimize, optimize_statistics, optimize_with_labels};
pub use options::{AdvancedOptions, ConstraintOptions, KktParams, ProblemType};

// Types that appear in results and options
pub use kktfolio_output::{Allocation, AssetWeight, Diagnostics, PortfolioMetrics};
pub use kktfolio_solver::{SolverMethod, TerminationStatus};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
