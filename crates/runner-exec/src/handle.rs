//! TaskHandle — the one future type every executor backend hands to a
//! `FuturesHolder` (spec §4.4, §9 "heterogeneous futures").
//!
//! A work task and a merge (tree-reduce) task both resolve to the same
//! payload type: compressed, serialized accumulator bytes. Keeping the
//! payload opaque here is what lets `FuturesHolder` treat the two kinds
//! uniformly while `Runner` still knows which is which when it matters
//! (attributing a failure to a `WorkItem`, say).

use tokio::task::JoinHandle;

use runner_core::error::RunnerError;
use runner_core::workitem::WorkItem;

pub type Payload = Result<Vec<u8>, RunnerError>;

/// A running or finished unit of work submitted to an executor backend.
pub enum TaskHandle {
    /// Produced by the user's work function on one chunk.
    Work { join: JoinHandle<Payload>, item: Box<WorkItem> },
    /// Produced by a tree-reduce merge of two or more prior results.
    Merge { join: JoinHandle<Payload> },
}

impl TaskHandle {
    pub fn is_finished(&self) -> bool {
        match self {
            TaskHandle::Work { join, .. } => join.is_finished(),
            TaskHandle::Merge { join } => join.is_finished(),
        }
    }

    pub fn abort(&self) {
        match self {
            TaskHandle::Work { join, .. } => join.abort(),
            TaskHandle::Merge { join } => join.abort(),
        }
    }

    pub fn item(&self) -> Option<&WorkItem> {
        match self {
            TaskHandle::Work { item, .. } => Some(item),
            TaskHandle::Merge { .. } => None,
        }
    }

    /// Resolve a handle. Intended to be called only once `is_finished()`
    /// holds, so the `.await` here never actually suspends.
    pub async fn join(self) -> Outcome {
        match self {
            TaskHandle::Work { join, item } => match join.await {
                Ok(Ok(bytes)) => Outcome::Ok { bytes, item: Some(item), is_merge: false },
                Ok(Err(error)) => Outcome::Err { error, item: Some(item), is_merge: false },
                Err(join_err) if join_err.is_cancelled() => {
                    Outcome::Cancelled { item: Some(item), is_merge: false }
                }
                Err(_) => Outcome::Err {
                    error: RunnerError::WorkerKilled { item: item.clone() },
                    item: Some(item),
                    is_merge: false,
                },
            },
            TaskHandle::Merge { join } => match join.await {
                Ok(Ok(bytes)) => Outcome::Ok { bytes, item: None, is_merge: true },
                Ok(Err(error)) => Outcome::Err { error, item: None, is_merge: true },
                Err(join_err) if join_err.is_cancelled() => {
                    Outcome::Cancelled { item: None, is_merge: true }
                }
                Err(join_err) => Outcome::Err {
                    error: RunnerError::Configuration(format!("merge task panicked: {join_err}")),
                    item: None,
                    is_merge: true,
                },
            },
        }
    }
}

/// Result of resolving one finished `TaskHandle`.
pub enum Outcome {
    Ok { bytes: Vec<u8>, item: Option<Box<WorkItem>>, is_merge: bool },
    Err { error: RunnerError, item: Option<Box<WorkItem>>, is_merge: bool },
    Cancelled { item: Option<Box<WorkItem>>, is_merge: bool },
}
