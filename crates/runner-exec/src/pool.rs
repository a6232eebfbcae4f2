//! PoolExecutor — local worker-pool backend (spec §4.5.2).
//!
//! Grounded on `compute_executor.rs`'s semaphore-bounded `tokio::spawn`
//! loop: a fixed number of permits gate concurrent work tasks, and an
//! optional second semaphore gates a separate pool for merge (reducer)
//! tasks, mirroring the original `FuturesExecutor`'s `pool`/`merge_pool`
//! split.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use runner_core::accumulator::Accumulator;
use runner_core::codec;
use runner_core::error::RunnerError;
use runner_core::workitem::WorkItem;

use crate::executor::Executor;
use crate::futures_holder::FuturesHolder;
use crate::handle::{Outcome, TaskHandle};

/// `(batch_divisor, min_batch, max_batch)` — see spec §4.5.2.
pub type MergingPolicy = (usize, usize, usize);

#[derive(Debug, Clone)]
pub struct PoolExecutor {
    pub workers: usize,
    pub merge_workers: Option<usize>,
    pub merging: Option<MergingPolicy>,
    pub compression: Option<u32>,
    pub refresh: Duration,
}

impl Default for PoolExecutor {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            merge_workers: None,
            merging: None,
            compression: Some(1),
            refresh: Duration::from_millis(200),
        }
    }
}

impl PoolExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    fn merge_size(&self, completed: usize, (n, min, max): MergingPolicy) -> usize {
        (completed / n + 1).clamp(min, max)
    }
}

impl Executor for PoolExecutor {
    async fn execute<A, F>(&self, items: Vec<WorkItem>, function: F, zero: A) -> (A, Option<RunnerError>)
    where
        A: Accumulator,
        F: Fn(WorkItem) -> Result<A, RunnerError> + Send + Sync + Clone + 'static,
    {
        let work_sema = Arc::new(Semaphore::new(self.workers.max(1)));
        let merge_sema = self
            .merge_workers
            .map(|n| Arc::new(Semaphore::new(n.max(1))))
            .unwrap_or_else(|| work_sema.clone());

        let compression = self.compression;
        let mut holder = FuturesHolder::new();

        for item in items {
            let permit = work_sema.clone().acquire_owned().await.expect("semaphore not closed");
            let function = function.clone();
            let item_for_task = item.clone();
            // The work function runs user I/O and processing code, which
            // blocks the calling thread — `spawn_blocking` keeps that off
            // tokio's async worker threads, unlike the merge tasks below.
            let join = tokio::task::spawn_blocking(move || {
                let result = function(item_for_task).map(|a| codec::encode_compressed(&a, compression));
                drop(permit);
                result
            });
            holder.add_work(TaskHandle::Work {
                join,
                item: Box::new(item),
            });
        }

        let mut completed: Vec<Vec<u8>> = Vec::new();
        let mut running_acc: Option<Vec<u8>> = None;
        let mut first_error: Option<RunnerError> = None;

        while !holder.is_empty() {
            let outcomes = holder.update(self.refresh).await;
            for outcome in outcomes {
                match outcome {
                    Outcome::Ok { bytes, .. } => {
                        if self.merging.is_some() {
                            completed.push(bytes);
                        } else {
                            running_acc = Some(match running_acc.take() {
                                None => bytes,
                                Some(acc) => codec::merge_compressed::<A>(&acc, &bytes, compression),
                            });
                        }
                    }
                    Outcome::Err { error, .. } => {
                        first_error.get_or_insert(error);
                    }
                    Outcome::Cancelled { item, is_merge } => {
                        if !is_merge {
                            if let Some(item) = item {
                                first_error.get_or_insert(RunnerError::WorkerKilled { item });
                            }
                        }
                    }
                }
            }

            if first_error.is_some() {
                // Only the still-running work handles are cut short; any
                // merge already in flight is allowed to finish so its
                // result folds into the partial accumulator below instead
                // of being silently discarded.
                holder.abort_running();
                for outcome in holder.drain_merges().await {
                    match outcome {
                        Outcome::Ok { bytes, .. } => completed.push(bytes),
                        Outcome::Err { error, .. } => {
                            first_error.get_or_insert(error);
                        }
                        Outcome::Cancelled { .. } => {}
                    }
                }
                break;
            }

            if let Some(policy) = self.merging {
                while completed.len() > 1 {
                    let still_running = holder.running_count() > 0;
                    let batch_size = self.merge_size(completed.len(), policy);
                    if still_running && completed.len() < policy.1 {
                        break;
                    }
                    let take = batch_size.min(completed.len());
                    let batch: Vec<Vec<u8>> = completed.drain(..take).collect();
                    let merge_permit = merge_sema.clone().acquire_owned().await.expect("semaphore not closed");
                    let join = tokio::spawn(async move {
                        let mut iter = batch.into_iter();
                        let mut acc = iter.next().expect("batch_size >= 1");
                        for next in iter {
                            acc = codec::merge_compressed::<A>(&acc, &next, compression);
                        }
                        drop(merge_permit);
                        Ok(acc)
                    });
                    holder.add_merge(TaskHandle::Merge { join });
                }
            }
        }

        // Fold every surviving batch — not just one — into the final
        // accumulator. On the success path `completed` normally already
        // holds a single fully-reduced batch by here, but on the error
        // path above it can hold several unmerged ones drained from
        // in-flight merges, and all of them belong in the partial result.
        let mut final_bytes = running_acc;
        for bytes in completed {
            final_bytes = Some(match final_bytes.take() {
                None => bytes,
                Some(acc) => codec::merge_compressed::<A>(&acc, &bytes, compression),
            });
        }

        let acc = match final_bytes {
            Some(bytes) => zero.merge(codec::decode_compressed::<A>(&bytes)),
            None => zero,
        };

        (acc, first_error)
    }
}
