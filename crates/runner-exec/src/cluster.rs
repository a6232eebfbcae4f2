//! ClusterExecutor — distributed backend with tree-reduce and worker
//! affinity (spec §4.5.3).
//!
//! The original ships one executor per scheduler (Dask, Parsl); those
//! collapse here into one `ClusterExecutor<B>` generic over a small
//! `ClusterBackend` trait, matching the spec's own framing of
//! "distributed backend" as an external collaborator with a narrow
//! contract. `InProcessClusterBackend` is the one concrete backend we
//! ship: no real network, but real worker-affinity routing and a
//! `tokio::time::sleep` standing in for network latency, so the
//! tree-reduce code path is exercised the same way a real backend would
//! drive it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
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

pub type WorkFn = Arc<dyn Fn(WorkItem) -> Result<Vec<u8>, RunnerError> + Send + Sync>;
pub type MergeFn = Arc<dyn Fn(Vec<Vec<u8>>) -> Result<Vec<u8>, RunnerError> + Send + Sync>;

/// Narrow contract a distributed scheduler must satisfy for
/// `ClusterExecutor` to drive it (spec's "abstract distributed backend",
/// out-of-scope section).
pub trait ClusterBackend: Send + Sync {
    fn worker_count(&self) -> usize;
    fn submit_work(&self, item: WorkItem, worker: usize, function: WorkFn) -> TaskHandle;
    fn submit_merge(&self, batch: Vec<Vec<u8>>, merge: MergeFn) -> TaskHandle;
}

fn worker_affinity(item: &WorkItem, worker_count: usize) -> usize {
    if worker_count == 0 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    item.fileuuid.hash(&mut hasher);
    item.treename.hash(&mut hasher);
    item.entrystart.hash(&mut hasher);
    item.entrystop.hash(&mut hasher);
    (hasher.finish() as usize) % worker_count
}

/// Simulated distributed backend: one `tokio::spawn` per task, a
/// per-worker semaphore of capacity 1 so affinity actually serializes
/// same-worker tasks, and a fixed latency to stand in for network RTT.
pub struct InProcessClusterBackend {
    workers: Vec<Arc<Semaphore>>,
    latency: Duration,
}

impl InProcessClusterBackend {
    pub fn new(worker_count: usize, latency: Duration) -> Self {
        Self {
            workers: (0..worker_count.max(1)).map(|_| Arc::new(Semaphore::new(1))).collect(),
            latency,
        }
    }
}

impl ClusterBackend for InProcessClusterBackend {
    fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn submit_work(&self, item: WorkItem, worker: usize, function: WorkFn) -> TaskHandle {
        let slot = self.workers[worker % self.workers.len()].clone();
        let latency = self.latency;
        let item_for_task = item.clone();
        // The network hop is simulated with an async sleep, but the actual
        // work function is blocking I/O/processing code — push it onto a
        // blocking thread rather than running it inline on this task.
        let join = tokio::spawn(async move {
            let _permit = slot.acquire_owned().await.expect("semaphore not closed");
            tokio::time::sleep(latency).await;
            tokio::task::spawn_blocking(move || function(item_for_task))
                .await
                .map_err(|e| RunnerError::Configuration(format!("worker task panicked: {e}")))?
        });
        TaskHandle::Work {
            join,
            item: Box::new(item),
        }
    }

    fn submit_merge(&self, batch: Vec<Vec<u8>>, merge: MergeFn) -> TaskHandle {
        let latency = self.latency;
        let join = tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            merge(batch)
        });
        TaskHandle::Merge { join }
    }
}

#[derive(Clone)]
pub struct ClusterExecutor<B: ClusterBackend> {
    pub backend: Arc<B>,
    pub branching: usize,
    pub compression: Option<u32>,
    pub refresh: Duration,
}

impl<B: ClusterBackend> ClusterExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            branching: 20,
            compression: Some(1),
            refresh: Duration::from_millis(200),
        }
    }
}

impl<B: ClusterBackend> Executor for ClusterExecutor<B> {
    async fn execute<A, F>(&self, items: Vec<WorkItem>, function: F, zero: A) -> (A, Option<RunnerError>)
    where
        A: Accumulator,
        F: Fn(WorkItem) -> Result<A, RunnerError> + Send + Sync + Clone + 'static,
    {
        let compression = self.compression;
        let work_fn: WorkFn = Arc::new(move |item| function(item).map(|a| codec::encode_compressed(&a, compression)));

        let worker_count = self.backend.worker_count();
        let mut holder = FuturesHolder::new();
        for item in items {
            let worker = worker_affinity(&item, worker_count);
            holder.add_work(self.backend.submit_work(item, worker, work_fn.clone()));
        }

        let mut first_error: Option<RunnerError> = None;
        let mut level: Vec<Vec<u8>> = Vec::new();

        while holder.running_count() > 0 {
            let outcomes = holder.update(self.refresh).await;
            for outcome in outcomes {
                match outcome {
                    Outcome::Ok { bytes, .. } => level.push(bytes),
                    Outcome::Err { error, .. } => {
                        first_error.get_or_insert(error);
                    }
                    Outcome::Cancelled { item, .. } => {
                        if let Some(item) = item {
                            first_error.get_or_insert(RunnerError::WorkerKilled { item });
                        }
                    }
                }
            }
        }

        if first_error.is_some() {
            let acc = fold_level(level, zero, compression);
            return (acc, first_error);
        }

        // Tree-reduce: repeatedly collapse `level` into groups of at most
        // `branching`, submitting one merge task per group, until one
        // handle (the root) remains.
        while level.len() > 1 {
            let branching = self.branching.max(1);
            let groups: Vec<Vec<Vec<u8>>> = level.chunks(branching).map(|c| c.to_vec()).collect();
            let mut merge_holder = FuturesHolder::new();
            for group in groups {
                let merge_fn: MergeFn = Arc::new(move |batch| {
                    let mut iter = batch.into_iter();
                    let mut acc = iter.next().expect("group is non-empty");
                    for next in iter {
                        acc = codec::merge_compressed::<A>(&acc, &next, compression);
                    }
                    Ok(acc)
                });
                merge_holder.add_merge(self.backend.submit_merge(group, merge_fn));
            }

            let mut next_level = Vec::new();
            while merge_holder.running_count() + merge_holder.merge_count() > 0 {
                let outcomes = merge_holder.update(self.refresh).await;
                for outcome in outcomes {
                    match outcome {
                        Outcome::Ok { bytes, .. } => next_level.push(bytes),
                        Outcome::Err { error, .. } => {
                            first_error.get_or_insert(error);
                        }
                        Outcome::Cancelled { .. } => {
                            first_error.get_or_insert(RunnerError::Configuration("merge task cancelled".into()));
                        }
                    }
                }
            }
            if first_error.is_some() {
                let acc = fold_level(next_level, zero, compression);
                return (acc, first_error);
            }
            level = next_level;
        }

        let acc = fold_level(level, zero, compression);
        (acc, None)
    }
}

fn fold_level<A: Accumulator>(level: Vec<Vec<u8>>, zero: A, compression: Option<u32>) -> A {
    let mut acc_bytes: Option<Vec<u8>> = None;
    for bytes in level {
        acc_bytes = Some(match acc_bytes.take() {
            None => bytes,
            Some(acc) => codec::merge_compressed::<A>(&acc, &bytes, compression),
        });
    }
    match acc_bytes {
        Some(bytes) => zero.merge(codec::decode_compressed::<A>(&bytes)),
        None => zero,
    }
}
