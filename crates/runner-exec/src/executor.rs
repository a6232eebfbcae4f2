//! Executor — the abstract dispatch contract (spec §4.5).
//!
//! `function` is always total over well-formed `WorkItem`s by the time it
//! reaches an executor: retry/skip policy (spec §4.6) is applied by the
//! caller composing `function` before dispatch, not by the executor
//! itself. An executor just needs to run a pile of closures over a pile
//! of items and fold the results, stopping at the first failure it
//! can't recover from.

use runner_core::accumulator::Accumulator;
use runner_core::error::RunnerError;
use runner_core::workitem::WorkItem;

/// One mapped-and-reduced run over a set of `WorkItem`s.
pub trait Executor: Send + Sync {
    /// Map `function` over every item and fold results into `zero` via
    /// `Accumulator::merge`. Returns the accumulator built from whatever
    /// completed, and the first unrecoverable error encountered, if any.
    async fn execute<A, F>(&self, items: Vec<WorkItem>, function: F, zero: A) -> (A, Option<RunnerError>)
    where
        A: Accumulator,
        F: Fn(WorkItem) -> Result<A, RunnerError> + Send + Sync + Clone + 'static;
}

/// Runs every item in-process, one at a time, no concurrency.
///
/// Grounded on the original `IterativeExecutor`: simplest possible
/// backend, mainly useful for tests and single-file debugging runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativeExecutor;

impl Executor for IterativeExecutor {
    async fn execute<A, F>(&self, items: Vec<WorkItem>, function: F, zero: A) -> (A, Option<RunnerError>)
    where
        A: Accumulator,
        F: Fn(WorkItem) -> Result<A, RunnerError> + Send + Sync + Clone + 'static,
    {
        let mut acc = zero;
        for item in items {
            match function(item) {
                Ok(partial) => acc = acc.merge(partial),
                Err(e) => return (acc, Some(e)),
            }
        }
        (acc, None)
    }
}
