//! External collaborator contracts (spec §6): the three narrow traits a
//! caller implements to plug a real file format and analysis into
//! `Runner`.

use std::collections::BTreeSet;

use runner_core::accumulator::Accumulator;
use runner_core::error::RunnerError;
use runner_core::workitem::WorkItem;

/// What a probe reports about one file (spec §6 "MetadataProbe contract").
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub numentries: u64,
    pub uuid: Vec<u8>,
    pub clusters: Option<Vec<u64>>,
}

/// Fetches `{numentries, uuid, clusters?}` for a file. Missing tree
/// surfaces as `RunnerError::MissingTree`.
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, dataset: &str, filename: &str, treename: &str) -> Result<ProbeResult, RunnerError>;
}

/// A lazily materialized view of events over one chunk's entry range.
pub trait EventsView: Send {
    /// Columns actually touched while the user processor ran, used when
    /// `save_metrics` is on.
    fn materialized_columns(&self) -> BTreeSet<String>;

    /// Lets a concrete `UserProcessor` downcast back to the `EventsView`
    /// its paired `EventReader` actually produces, since `process` only
    /// ever sees the trait object.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Opens an entry range of one file's tree as an `EventsView`.
pub trait EventReader: Send + Sync {
    fn open(&self, item: &WorkItem, schema: Option<&[String]>) -> Result<Box<dyn EventsView>, RunnerError>;
}

/// The domain-specific analysis function (spec's "out of scope" external
/// collaborator): maps one chunk's events to a partial accumulator, then
/// folds a side effect into the final merged one.
pub trait UserProcessor<A: Accumulator>: Send + Sync {
    fn process(&self, events: &dyn EventsView) -> Result<A, RunnerError>;

    /// Side-effecting finalization step over the fully merged accumulator.
    /// Default is a no-op.
    fn postprocess(&self, _accumulator: &mut A) {}
}
