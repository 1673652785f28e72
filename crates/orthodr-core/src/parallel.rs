//! Shared-memory execution context.
//!
//! An [`Executor`] is either serial or owns a rayon thread pool sized for the
//! run. Parallel regions are pure fork-join: every task writes to a disjoint
//! output slot and the pool joins before control returns to the driver.
//! Work executed inside a parallel region must be handed
//! [`Executor::serial`] so that nested regions never fan out again.

use crate::error::{SolverError, SolverResult};
use log::warn;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Execution context for the kernel engine and the gradient estimator.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: Option<Arc<ThreadPool>>,
    threads: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self::serial()
    }
}

impl Executor {
    /// Runs everything inline on the calling thread.
    pub fn serial() -> Self {
        Self {
            pool: None,
            threads: 1,
        }
    }

    /// Builds an executor for `ncore` threads.
    ///
    /// `ncore == 0` selects every available core. Requests beyond the number
    /// of available cores are capped with a warning.
    pub fn with_threads(ncore: usize) -> SolverResult<Self> {
        let available = num_cpus::get().max(1);
        let requested = if ncore == 0 { available } else { ncore };
        let threads = if requested > available {
            warn!(
                "requested {requested} cores but only {available} are available; using {available}"
            );
            available
        } else {
            requested
        };
        Self::exact(threads)
    }

    /// Builds an executor with exactly `threads` workers, without capping.
    pub fn exact(threads: usize) -> SolverResult<Self> {
        if threads <= 1 {
            return Ok(Self::serial());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("orthodr-worker-{i}"))
            .build()
            .map_err(|e| SolverError::invalid_configuration(e.to_string(), "ncore", threads))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
            threads,
        })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Whether work is fanned out to a pool.
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Runs `op` inside the pool, or inline when serial.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}
