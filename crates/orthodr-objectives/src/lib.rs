//! Estimating-equation objectives for orthogonality constrained dimension
//! reduction.
//!
//! Every objective implements [`ObjectiveOracle`](orthodr_core::objective::ObjectiveOracle)
//! and can be handed to the Stiefel solver directly. The data-driven
//! objectives share one pipeline: project the covariates onto the current
//! directions, build a Gaussian kernel matrix and reduce it into a scalar.
//!
//! # Modules
//!
//! - [`general`]: Objective from user supplied closures
//! - [`local`]: Local-smoothing estimating equation
//! - [`moment`]: Semiparametric SIR, SAVE and PHD
//! - [`survival`]: Counting-process survival equations and data preparation
//!
//! # Example
//!
//! ```
//! use orthodr_objectives::prelude::*;
//! use orthodr_core::{parallel::Executor, types::DMatrix};
//!
//! let x = DMatrix::from_fn(20, 2, |i, j| ((i * (j + 1)) % 5) as f64);
//! let y = DMatrix::from_fn(20, 1, |i, _| x[(i, 0)] * 0.5);
//! let objective = LocalObjective::new(x, y, 1.0).unwrap();
//! let b = DMatrix::from_column_slice(2, 1, &[1.0, 0.0]);
//! let value = objective.value(&b, &Executor::serial()).unwrap();
//! assert!(value >= 0.0);
//! ```

pub mod general;
pub mod local;
pub mod moment;
pub mod survival;

mod validation;

pub use general::GeneralObjective;
pub use local::LocalObjective;
pub use moment::{MomentMethod, MomentObjective};
pub use survival::{SurvivalData, SurvivalMethod, SurvivalObjective};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::general::GeneralObjective;
    pub use crate::local::LocalObjective;
    pub use crate::moment::{slice_labels, MomentMethod, MomentObjective};
    pub use crate::survival::{SurvivalData, SurvivalMethod, SurvivalObjective};
    pub use orthodr_core::objective::ObjectiveOracle;
}
