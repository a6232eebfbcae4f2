//! FuturesHolder — bookkeeping for in-flight work and merge tasks
//! (spec §4.4), grounded on the original `_FuturesHolder` generator
//! helper and the polling style of `summit-core`'s `chunk/manager.rs`.
//!
//! `update` waits up to a budget for at least one handle to finish, then
//! drains every handle that is finished at that point — the same
//! "first-completed-or-more" semantics as `concurrent.futures.wait(...,
//! return_when=FIRST_COMPLETED)`, implemented here as a short poll loop
//! since tokio's `JoinHandle` doesn't expose a waitable set directly.

use std::time::Duration;

use crate::handle::{Outcome, TaskHandle};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn any_finished(handles: &[TaskHandle]) -> bool {
    handles.iter().any(|h| h.is_finished())
}

#[derive(Default)]
pub struct FuturesHolder {
    running: Vec<TaskHandle>,
    merges: Vec<TaskHandle>,
    pub done_running: usize,
    pub done_merges: usize,
}

impl FuturesHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_work(&mut self, handle: TaskHandle) {
        debug_assert!(matches!(handle, TaskHandle::Work { .. }));
        self.running.push(handle);
    }

    pub fn add_merge(&mut self, handle: TaskHandle) {
        debug_assert!(matches!(handle, TaskHandle::Merge { .. }));
        self.merges.push(handle);
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn merge_count(&self) -> usize {
        self.merges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.merges.is_empty()
    }

    /// Wait up to `refresh` for progress, then return every `Outcome`
    /// that became available (work outcomes first, then merge outcomes).
    pub async fn update(&mut self, refresh: Duration) -> Vec<Outcome> {
        let deadline = tokio::time::Instant::now() + refresh;
        loop {
            let ready = any_finished(&self.running) || any_finished(&self.merges);
            if ready || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let mut outcomes = Vec::new();
        outcomes.extend(self.take_finished(true).await);
        outcomes.extend(self.take_finished(false).await);
        outcomes
    }

    async fn take_finished(&mut self, from_running: bool) -> Vec<Outcome> {
        let handles = if from_running { &mut self.running } else { &mut self.merges };
        let mut finished = Vec::new();
        let mut i = 0;
        while i < handles.len() {
            if handles[i].is_finished() {
                finished.push(handles.remove(i));
            } else {
                i += 1;
            }
        }
        let mut outcomes = Vec::with_capacity(finished.len());
        for handle in finished {
            if from_running {
                self.done_running += 1;
            } else {
                self.done_merges += 1;
            }
            outcomes.push(handle.join().await);
        }
        outcomes
    }

    /// Abort every outstanding task, e.g. after a fatal error.
    pub fn abort_all(&mut self) {
        for h in self.running.iter().chain(self.merges.iter()) {
            h.abort();
        }
    }

    /// Abort outstanding work tasks only, leaving merge tasks running so
    /// the caller can drain them into a partial result instead of losing
    /// whatever's already been reduced.
    pub fn abort_running(&mut self) {
        for h in self.running.drain(..) {
            h.abort();
        }
    }

    /// Await every outstanding merge task to completion, returning their
    /// outcomes. Unlike `update`, this doesn't poll or time out — it's only
    /// meant to be called once no more work will arrive for these merges.
    pub async fn drain_merges(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(self.merges.len());
        for handle in self.merges.drain(..) {
            self.done_merges += 1;
            outcomes.push(handle.join().await);
        }
        outcomes
    }
}
