//! Error types for objective evaluation and the Stiefel solver.
//!
//! Errors are split the same way the optimisation stack is split: problems with
//! the data or with an estimating equation surface as [`ObjectiveError`], while
//! configuration and numerical failures of the driver surface as
//! [`SolverError`]. An objective error raised inside a solver run is wrapped
//! transparently.

use nalgebra::DMatrix;
use thiserror::Error;

/// Errors raised while validating data or evaluating an objective.
#[derive(Debug, Clone, Error)]
pub enum ObjectiveError {
    /// Dimension mismatch between inputs.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Kernel bandwidth is not a positive finite number.
    #[error("Invalid kernel bandwidth {value}: bandwidth must be positive and finite")]
    InvalidBandwidth {
        /// Offending bandwidth
        value: f64,
    },

    /// Survival data violates the ascending event-time ordering.
    ///
    /// The counting-process objectives sweep the risk sets from the last
    /// failure backwards and rely on this ordering.
    #[error("Survival data is not sorted by event time: {reason}")]
    UnsortedData {
        /// Description of the violation
        reason: String,
    },

    /// Input data cannot be used (empty, non-finite, rank deficient).
    #[error("Invalid data: {reason}")]
    InvalidData {
        /// Description of the problem
        reason: String,
    },

    /// A user supplied callback failed or returned an unusable value.
    #[error("Objective evaluation failed: {reason}")]
    EvaluationFailed {
        /// Description of the failure
        reason: String,
    },
}

impl ObjectiveError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an UnsortedData error.
    pub fn unsorted<S: Into<String>>(reason: S) -> Self {
        Self::UnsortedData {
            reason: reason.into(),
        }
    }

    /// Create an InvalidData error.
    pub fn invalid_data<S: Into<String>>(reason: S) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }

    /// Create an EvaluationFailed error.
    pub fn evaluation_failed<S: Into<String>>(reason: S) -> Self {
        Self::EvaluationFailed {
            reason: reason.into(),
        }
    }

    /// Validates a kernel bandwidth, returning it unchanged when usable.
    pub fn check_bandwidth(bw: f64) -> std::result::Result<f64, Self> {
        if bw.is_finite() && bw > 0.0 {
            Ok(bw)
        } else {
            Err(Self::InvalidBandwidth { value: bw })
        }
    }
}

/// Errors raised by the Stiefel solver.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// Invalid solver configuration.
    #[error("Invalid solver configuration: {reason} ({parameter} = {value})")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// The linear system of the Cayley retraction could not be solved.
    #[error("Singular {size}x{size} retraction system at iteration {iteration} (tau = {tau:e})")]
    SingularSystem {
        /// Driver iteration (0 while initialising)
        iteration: usize,
        /// Step size used to build the system
        tau: f64,
        /// Order of the square system
        size: usize,
        /// The system matrix that failed to factorise
        system: DMatrix<f64>,
    },

    /// The objective or its gradient became NaN or infinite.
    #[error("Non-finite objective at iteration {iteration}: F = {value}, |G| = {gradient_norm}")]
    NonFinite {
        /// Driver iteration (0 for the initial point)
        iteration: usize,
        /// Objective value
        value: f64,
        /// Norm of the projected gradient
        gradient_norm: f64,
    },

    /// Propagated objective error.
    #[error("Objective evaluation failed: {0}")]
    Objective(#[from] ObjectiveError),
}

impl SolverError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: std::fmt::Display,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a SingularSystem error from the failing system matrix.
    pub fn singular_system(iteration: usize, tau: f64, system: DMatrix<f64>) -> Self {
        Self::SingularSystem {
            iteration,
            tau,
            size: system.nrows(),
            system,
        }
    }
}

/// Result type alias for objective operations.
pub type ObjectiveResult<T> = std::result::Result<T, ObjectiveError>;

/// Result type alias for solver operations.
pub type SolverResult<T> = std::result::Result<T, SolverError>;
