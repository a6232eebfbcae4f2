//! The built-in word-count demo: a `MetadataProbe`/`EventReader` pair over
//! plain local text files, and a `UserProcessor` that counts words per
//! line range. Stands in for the real file-reading library the core
//! treats as an external collaborator (spec's out-of-scope section).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use serde::{Deserialize, Serialize};

use runner_core::accumulator::Accumulator;
use runner_core::error::RunnerError;
use runner_core::workitem::WorkItem;
use runner_exec::traits::{EventReader, EventsView, MetadataProbe, ProbeResult};
use runner_exec::UserProcessor;

/// One "entry" is one line of the file; `treename` is ignored (text files
/// have no trees), carried only because the fileset shape requires one.
pub struct DemoProbe;

impl MetadataProbe for DemoProbe {
    fn probe(&self, _dataset: &str, filename: &str, _treename: &str) -> Result<ProbeResult, RunnerError> {
        let contents = fs::read_to_string(filename).map_err(|e| RunnerError::Probe {
            filename: filename.to_string(),
            source: Box::new(e),
        })?;
        let numentries = contents.lines().count() as u64;
        Ok(ProbeResult {
            numentries,
            uuid: blake3_like_id(filename),
            clusters: None,
        })
    }
}

/// A cheap stand-in for a real file identifier: the point is stability
/// across runs, not cryptographic strength.
fn blake3_like_id(filename: &str) -> Vec<u8> {
    let mut hash = [0u8; 16];
    for (i, byte) in filename.bytes().enumerate() {
        hash[i % 16] ^= byte;
    }
    hash.to_vec()
}

pub struct LineEvents {
    lines: Vec<String>,
}

impl EventsView for LineEvents {
    fn materialized_columns(&self) -> BTreeSet<String> {
        BTreeSet::from(["line".to_string()])
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct DemoReader;

impl EventReader for DemoReader {
    fn open(&self, item: &WorkItem, _schema: Option<&[String]>) -> Result<Box<dyn EventsView>, RunnerError> {
        let contents = fs::read_to_string(&item.filename).map_err(|e| RunnerError::Read {
            item: Box::new(item.clone()),
            source: Box::new(e),
        })?;
        let lines: Vec<String> = contents
            .lines()
            .skip(item.entrystart as usize)
            .take(item.len() as usize)
            .map(str::to_string)
            .collect();
        Ok(Box::new(LineEvents { lines }))
    }
}

/// Word -> occurrence count. The merge is a plain count sum, associative
/// and commutative, so tree-reduce branching never changes the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordCounts(pub BTreeMap<String, u64>);

impl Accumulator for WordCounts {
    fn zero() -> Self {
        WordCounts::default()
    }

    fn merge(mut self, other: Self) -> Self {
        for (word, count) in other.0 {
            *self.0.entry(word).or_insert(0) += count;
        }
        self
    }
}

pub struct WordCountProcessor;

impl UserProcessor<WordCounts> for WordCountProcessor {
    fn process(&self, events: &dyn EventsView) -> Result<WordCounts, RunnerError> {
        let _ = events.materialized_columns();
        // `EventsView` is a trait object so the processor only ever sees
        // the narrow contract; downcast back to the concrete demo type.
        let lines = events
            .as_any()
            .downcast_ref::<LineEvents>()
            .expect("DemoReader only ever produces LineEvents")
            .lines
            .clone();

        let mut counts = BTreeMap::new();
        for line in lines {
            for word in line.split_whitespace() {
                let normalized = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                if normalized.is_empty() {
                    continue;
                }
                *counts.entry(normalized).or_insert(0u64) += 1;
            }
        }
        Ok(WordCounts(counts))
    }
}
