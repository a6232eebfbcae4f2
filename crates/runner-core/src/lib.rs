//! runner-core — shared types for the batch-processing runner.
//!
//! Everything here is driver-side and backend-agnostic: file metadata,
//! chunk descriptors, the accumulator contract, the LZ4 codec used to
//! ship accumulators in flight, the metadata cache, and the retry policy.
//! Execution backends and the top-level orchestrator live in `runner-exec`.

pub mod accumulator;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod filemeta;
pub mod fileset;
pub mod retry;
pub mod workitem;

pub use accumulator::Accumulator;
pub use error::RunnerError;
pub use filemeta::{FileMeta, Metadata, RESERVED_METADATA_KEYS};
pub use fileset::{Fileset, FilesetEntry, FilesOrMap};
pub use workitem::{Chunker, WorkItem};
