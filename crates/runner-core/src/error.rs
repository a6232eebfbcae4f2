//! Error taxonomy for the runner core.
//!
//! Mirrors the distinctions the retry/bad-file policy needs to make:
//! I/O vs. missing-tree vs. auth vs. user-code failures each get routed
//! differently by `retry::RetryDriver`.

use crate::workitem::WorkItem;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Metadata could not be fetched for a file.
    #[error("failed to probe metadata for {filename}: {source}")]
    Probe {
        filename: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O failure while reading a chunk's events.
    #[error("read error for {item:?}: {source}")]
    Read {
        item: Box<WorkItem>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Specialization of Probe/Read: the requested tree/collection is absent.
    #[error("missing tree {treename:?} in {filename}")]
    MissingTree { filename: String, treename: String },

    /// "Auth failed" anywhere in the cause chain. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A distributed worker died mid-task. Carries the offending item.
    #[error("worker killed while processing {item:?}")]
    WorkerKilled { item: Box<WorkItem> },

    /// `reader.open` didn't return within `read_timeout` seconds.
    #[error("timed out after {seconds}s opening {item:?}")]
    Timeout { item: Box<WorkItem>, seconds: u64 },

    /// The user's `process` call raised.
    #[error("user processor failed on {item:?}: {source}")]
    User {
        item: Box<WorkItem>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid fileset shape, reserved metadata collision, or executor
    /// misconfiguration. Raised before any work is dispatched.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RunnerError {
    /// Walk the transitive `source()` chain, innermost error last out.
    ///
    /// Used by the retry driver to classify failures without downcasting
    /// at every call site.
    pub fn chain(&self) -> Vec<&(dyn std::error::Error + 'static)> {
        let mut out: Vec<&(dyn std::error::Error + 'static)> = vec![self];
        let mut cur: &(dyn std::error::Error + 'static) = self;
        while let Some(next) = cur.source() {
            out.push(next);
            cur = next;
        }
        out
    }

    /// True if any error in the chain renders as containing `needle`.
    pub fn chain_contains(&self, needle: &str) -> bool {
        self.chain().iter().any(|e| e.to_string().contains(needle))
    }

    /// True if the chain contains an I/O error or a missing-tree error,
    /// per spec §4.6's bad-file skip rule.
    pub fn is_bad_file(&self) -> bool {
        matches!(self, RunnerError::MissingTree { .. })
            || self
                .chain()
                .iter()
                .any(|e| e.downcast_ref::<std::io::Error>().is_some())
    }
}
