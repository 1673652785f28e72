//! Core types for orthogonality constrained dimension reduction.
//!
//! This crate provides the numerical building blocks shared by every
//! estimating equation: the Gaussian kernel engine, the objective interface,
//! the finite-difference gradient estimator and the execution context that
//! decides whether work runs inline or on a thread pool.
//!
//! # Modules
//!
//! - [`config`]: Solver tolerances and control parameters
//! - [`error`]: Error types for objectives and the solver
//! - [`gradient`]: Finite-difference gradient estimation
//! - [`kernel`]: Gaussian kernel weights and Nadaraya-Watson smoothing
//! - [`objective`]: Objective interface and evaluation counting
//! - [`parallel`]: Serial or pooled execution context
//! - [`subspace`]: Random starting points and subspace distances
//! - [`types`]: Type aliases, constants and matrix helpers

pub mod config;
pub mod error;
pub mod gradient;
pub mod kernel;
pub mod objective;
pub mod parallel;
pub mod subspace;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{ObjectiveError, ObjectiveResult, SolverError, SolverResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use orthodr_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{FiniteDifference, RetractionKind, SolverConfig};
    pub use crate::error::{ObjectiveError, ObjectiveResult, SolverError, SolverResult};
    pub use crate::gradient::GradientEstimator;
    pub use crate::kernel::{
        nadaraya_watson, scaled_projection, silverman_bandwidth, GaussianKernel,
    };
    pub use crate::objective::{CountingObjective, ObjectiveOracle};
    pub use crate::parallel::Executor;
    pub use crate::subspace::{random_stiefel_point, subspace_distance, SubspaceDistance};
    pub use crate::types::{constants, feasibility, DMatrix, DVector};
}
