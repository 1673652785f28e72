//! Per-iteration diagnostics and the multi-criterion stopping rule.
//!
//! The tracker keeps the last [`HISTORY_WINDOW`] records in a ring buffer for
//! the averaged test, plus a growable log of every record for reporting.

use orthodr_core::{config::SolverConfig, types::constants::HISTORY_WINDOW};
use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostics of one completed driver iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IterationRecord {
    /// Driver iteration, starting at 1
    pub iteration: usize,
    /// Objective value at the accepted point
    pub objective_value: f64,
    /// Non-monotone reference value Cval the Armijo test compared against
    pub reference_value: f64,
    /// ||G - B G^T B||_F at the accepted point
    pub gradient_norm: f64,
    /// ||B - B_prev||_F / sqrt(P)
    pub param_change: f64,
    /// |F_prev - F| / (|F_prev| + 1)
    pub value_change: f64,
    /// Step size of the accepted trial point
    pub tau: f64,
    /// Number of step-size reductions before acceptance
    pub backtracks: usize,
    /// Whether the accepted point met the sufficient-decrease test
    pub armijo_satisfied: bool,
}

/// Which part of the stopping rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConvergenceRule {
    /// Parameter and value change both below tolerance
    SmallStep,
    /// Projected gradient norm below tolerance
    SmallGradient,
    /// Window averages of parameter and value change below tolerance
    AveragedStep,
}

/// Stopping-rule state of a solver run.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    btol: f64,
    ftol: f64,
    gtol: f64,
    window: VecDeque<IterationRecord>,
    log: Vec<IterationRecord>,
}

impl ConvergenceTracker {
    /// Creates an empty tracker with the given tolerances.
    pub fn new(btol: f64, ftol: f64, gtol: f64) -> Self {
        Self {
            btol,
            ftol,
            gtol,
            window: VecDeque::with_capacity(HISTORY_WINDOW),
            log: Vec::new(),
        }
    }

    /// Tracker using the tolerances of `config`.
    pub fn from_config(config: &SolverConfig) -> Self {
        let mut tracker = Self::new(config.btol, config.ftol, config.gtol);
        tracker.log.reserve(config.max_iterations.min(1024));
        tracker
    }

    /// Appends the diagnostics of a completed iteration.
    pub fn push(&mut self, record: IterationRecord) {
        if self.window.len() == HISTORY_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(record);
        self.log.push(record);
    }

    /// Evaluates the stopping rule against the latest record.
    ///
    /// Nothing is tested before [`HISTORY_WINDOW`] iterations have completed.
    pub fn check(&self) -> Option<ConvergenceRule> {
        if self.log.len() < HISTORY_WINDOW {
            return None;
        }
        let latest = self.window.back()?;
        if latest.param_change < self.btol && latest.value_change < self.ftol {
            return Some(ConvergenceRule::SmallStep);
        }
        if latest.gradient_norm < self.gtol {
            return Some(ConvergenceRule::SmallGradient);
        }
        let (param, value) = self.window_means();
        if param < self.btol && value < self.ftol {
            return Some(ConvergenceRule::AveragedStep);
        }
        None
    }

    /// Means of the parameter and value changes over the window.
    pub fn window_means(&self) -> (f64, f64) {
        if self.window.is_empty() {
            return (f64::NAN, f64::NAN);
        }
        let n = self.window.len() as f64;
        let param: f64 = self.window.iter().map(|r| r.param_change).sum();
        let value: f64 = self.window.iter().map(|r| r.value_change).sum();
        (param / n, value / n)
    }

    /// Most recent record.
    pub fn latest(&self) -> Option<&IterationRecord> {
        self.window.back()
    }

    /// Every record so far, in iteration order.
    pub fn history(&self) -> &[IterationRecord] {
        &self.log
    }

    /// Number of completed iterations.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether no iteration has completed yet.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Consumes the tracker, returning the full log.
    pub fn into_history(self) -> Vec<IterationRecord> {
        self.log
    }
}
