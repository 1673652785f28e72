//! Orthogonality constrained optimisation for semiparametric dimension
//! reduction.
//!
//! The estimators search for a P x ndr matrix B with orthonormal columns that
//! minimises an estimating-equation objective. This crate bundles the three
//! building blocks:
//!
//! - [`core`]: kernel engine, objective interface, gradient estimator,
//!   configuration and errors
//! - [`objectives`]: local smoothing, SIR, SAVE, PHD and survival objectives
//! - [`optim`]: the Stiefel curvilinear-search solver
//!
//! # Example
//!
//! ```
//! use orthodr::prelude::*;
//!
//! let x = DMatrix::from_fn(30, 3, |i, j| (((i + 1) * (j + 2)) % 7) as f64 - 3.0);
//! let y = DMatrix::from_fn(30, 1, |i, _| x[(i, 0)] - x[(i, 2)]);
//! let objective = LocalObjective::new(x, y, 1.0)?;
//!
//! let b0 = DMatrix::from_column_slice(3, 1, &[1.0, 0.0, 0.0]);
//! let result = StiefelOptimizer::new(SolverConfig::default().with_max_iterations(50))
//!     .solve(&objective, b0)?;
//! assert!(result.feasibility < 1e-6);
//! # Ok::<(), SolverError>(())
//! ```

pub use nalgebra;
pub use orthodr_core as core;
pub use orthodr_objectives as objectives;
pub use orthodr_optim as optim;

pub use orthodr_core::{ObjectiveError, ObjectiveResult, SolverError, SolverResult};
pub use orthodr_optim::{OptimizationResult, StiefelOptimizer};

/// Everything needed to set up and run an estimator.
pub mod prelude {
    pub use orthodr_core::prelude::*;
    pub use orthodr_objectives::prelude::*;
    pub use orthodr_optim::prelude::*;
}
