//! Orthogonality constrained optimisation on the Stiefel manifold.
//!
//! This crate provides the curvilinear-search driver used by every
//! dimension-reduction objective: Cayley retractions in dense and low-rank
//! form, a non-monotone Barzilai-Borwein line search, the multi-criterion
//! stopping rule and the plain-text progress output.
//!
//! # Modules
//!
//! - [`convergence`]: Iteration records and the stopping rule
//! - [`report`]: Verbose output and `%g` number formatting
//! - [`result`]: Final state of a run
//! - [`retraction`]: Dense and low-rank Cayley retractions
//! - [`solver`]: The curvilinear-search driver
//!
//! # Example
//!
//! ```
//! use orthodr_core::{config::SolverConfig, types::DMatrix};
//! use orthodr_objectives::GeneralObjective;
//! use orthodr_optim::StiefelOptimizer;
//!
//! // maximise the weight on the first two coordinates
//! let objective = GeneralObjective::new(4, |b: &DMatrix<f64>| {
//!     -(b[(0, 0)].powi(2) + b[(1, 0)].powi(2))
//! });
//! let b0 = DMatrix::from_column_slice(4, 1, &[0.5, 0.5, 0.5, 0.5]);
//! let solver = StiefelOptimizer::new(SolverConfig::default());
//! let result = solver.solve(&objective, b0).unwrap();
//! assert!(result.value < -0.99);
//! ```

pub mod convergence;
pub mod report;
pub mod result;
pub mod retraction;
pub mod solver;

pub use convergence::{ConvergenceRule, ConvergenceTracker, IterationRecord};
pub use report::{format_g, Reporter};
pub use result::{OptimizationResult, TerminationReason};
pub use retraction::{select_retraction, DenseCayley, LowRankCayley, StiefelRetraction};
pub use solver::{projected_gradient, StiefelOptimizer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::convergence::{ConvergenceRule, IterationRecord};
    pub use crate::result::{OptimizationResult, TerminationReason};
    pub use crate::retraction::StiefelRetraction;
    pub use crate::solver::StiefelOptimizer;
    pub use orthodr_core::config::{FiniteDifference, RetractionKind, SolverConfig};
}
