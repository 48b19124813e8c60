#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/kktfolio/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod active_set;
pub mod config;
pub mod error;
pub mod factorization;
pub mod kkt;
pub mod problem;

// Re-export main types
pub use active_set::{
    ActiveSetContext, ActiveSetSolver, ActiveSetState, Adjustment, Iterate, Solution,
    TerminationStatus,
};
pub use config::{SolverConfig, SolverMethod};
pub use error::SolverError;
pub use factorization::{Factorization, FactorizationError};
pub use kkt::{KktSolution, KktSystem, solve_kkt};
pub use problem::QpProblem;
