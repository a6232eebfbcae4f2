//! Shared fixtures for the end-to-end `Runner` tests: in-memory
//! probe/reader pairs plus small accumulators, distinct from
//! `runner-cli`'s file-backed demo collaborators.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use runner_core::error::RunnerError;
use runner_core::workitem::WorkItem;
use runner_exec::traits::{EventReader, EventsView, MetadataProbe, ProbeResult};
use runner_exec::UserProcessor;

/// Probe with a fixed `numentries`/`clusters` answer per dataset, counting
/// how many times each filename was actually probed.
pub struct CountingProbe {
    pub numentries: u64,
    pub clusters: Option<Vec<u64>>,
    pub fail_filenames: Vec<String>,
    pub calls: Mutex<HashMap<String, usize>>,
}

impl CountingProbe {
    pub fn new(numentries: u64) -> Self {
        Self {
            numentries,
            clusters: None,
            fail_filenames: Vec::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clusters(mut self, clusters: Vec<u64>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    pub fn failing(mut self, filename: &str) -> Self {
        self.fail_filenames.push(filename.to_string());
        self
    }

    pub fn call_count(&self, filename: &str) -> usize {
        self.calls.lock().unwrap().get(filename).copied().unwrap_or(0)
    }
}

impl MetadataProbe for CountingProbe {
    fn probe(&self, _dataset: &str, filename: &str, treename: &str) -> Result<ProbeResult, RunnerError> {
        *self.calls.lock().unwrap().entry(filename.to_string()).or_insert(0) += 1;
        if self.fail_filenames.iter().any(|f| f == filename) {
            return Err(RunnerError::MissingTree {
                filename: filename.to_string(),
                treename: treename.to_string(),
            });
        }
        Ok(ProbeResult {
            numentries: self.numentries,
            uuid: vec![0xCD; 16],
            clusters: self.clusters.clone(),
        })
    }
}

/// Events that carry nothing but the chunk's entry range, so a processor
/// can key behavior off which chunk it's looking at without needing the
/// underlying `WorkItem`.
pub struct RangeEvents {
    pub entrystart: u64,
    pub len: u64,
}

impl EventsView for RangeEvents {
    fn materialized_columns(&self) -> BTreeSet<String> {
        BTreeSet::from(["range".to_string()])
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct InMemoryReader;

impl EventReader for InMemoryReader {
    fn open(&self, item: &WorkItem, _schema: Option<&[String]>) -> Result<Box<dyn EventsView>, RunnerError> {
        Ok(Box::new(RangeEvents {
            entrystart: item.entrystart,
            len: item.len(),
        }))
    }
}

/// A reader that fails to open a chunk starting at `fail_at_entrystart`
/// the first `flaky_attempts` times it's asked, then succeeds.
pub struct FlakyReader {
    pub fail_at_entrystart: u64,
    pub flaky_attempts: u32,
    attempts: AtomicUsize,
}

impl FlakyReader {
    pub fn new(fail_at_entrystart: u64, flaky_attempts: u32) -> Self {
        Self {
            fail_at_entrystart,
            flaky_attempts,
            attempts: AtomicUsize::new(0),
        }
    }
}

impl EventReader for FlakyReader {
    fn open(&self, item: &WorkItem, _schema: Option<&[String]>) -> Result<Box<dyn EventsView>, RunnerError> {
        if item.entrystart == self.fail_at_entrystart {
            let seen = self.attempts.fetch_add(1, Ordering::SeqCst);
            if (seen as u32) < self.flaky_attempts {
                return Err(RunnerError::Read {
                    item: Box::new(item.clone()),
                    source: Box::new(std::io::Error::new(std::io::ErrorKind::TimedOut, "Socket timeout")),
                });
            }
        }
        Ok(Box::new(RangeEvents {
            entrystart: item.entrystart,
            len: item.len(),
        }))
    }
}

/// Plain chunk counter.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Counter(pub u64);

impl runner_core::accumulator::Accumulator for Counter {
    fn zero() -> Self {
        Counter(0)
    }
    fn merge(self, other: Self) -> Self {
        Counter(self.0 + other.0)
    }
}

/// Every chunk's length, for tests that need to check the chunking shape
/// end-to-end rather than just the chunk count.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lengths(pub Vec<u64>);

impl runner_core::accumulator::Accumulator for Lengths {
    fn zero() -> Self {
        Lengths(Vec::new())
    }
    fn merge(mut self, mut other: Self) -> Self {
        self.0.append(&mut other.0);
        self.0.sort_unstable();
        self
    }
}

pub struct CountProcessor;
impl UserProcessor<Counter> for CountProcessor {
    fn process(&self, events: &dyn EventsView) -> Result<Counter, RunnerError> {
        let _ = events.materialized_columns();
        Ok(Counter(1))
    }
}

pub struct LengthProcessor;
impl UserProcessor<Lengths> for LengthProcessor {
    fn process(&self, events: &dyn EventsView) -> Result<Lengths, RunnerError> {
        let range = events.as_any().downcast_ref::<RangeEvents>().expect("InMemoryReader only produces RangeEvents");
        Ok(Lengths(vec![range.len]))
    }
}

/// Fails every chunk whose entry range starts at `fail_at_entrystart`,
/// otherwise counts it normally. Models a user analysis function raising
/// on one particular chunk (recoverable-failure scenarios).
pub struct FailAtProcessor {
    pub fail_at_entrystart: u64,
}
impl UserProcessor<Counter> for FailAtProcessor {
    fn process(&self, events: &dyn EventsView) -> Result<Counter, RunnerError> {
        let range = events.as_any().downcast_ref::<RangeEvents>().expect("InMemoryReader only produces RangeEvents");
        if range.entrystart == self.fail_at_entrystart {
            return Err(RunnerError::Configuration(format!("user processor blew up on chunk at {}", range.entrystart)));
        }
        Ok(Counter(1))
    }
}

pub fn single_file_fileset(dataset: &str, filename: &str) -> runner_core::fileset::Fileset {
    let mut fs = runner_core::fileset::Fileset::new();
    fs.insert(
        dataset.to_string(),
        runner_core::fileset::FilesetEntry::List(vec![filename.to_string()]),
    );
    fs
}

pub fn multi_file_fileset(dataset: &str, filenames: &[&str]) -> runner_core::fileset::Fileset {
    let mut fs = runner_core::fileset::Fileset::new();
    fs.insert(
        dataset.to_string(),
        runner_core::fileset::FilesetEntry::List(filenames.iter().map(|f| f.to_string()).collect()),
    );
    fs
}

pub fn fresh_cache() -> runner_core::cache::SharedMetadataCache {
    Arc::new(tokio::sync::Mutex::new(runner_core::cache::MetadataCache::new(16)))
}
