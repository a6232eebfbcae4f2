//! runner-exec — dispatch backends and the top-level orchestrator.
//!
//! `runner-core` defines what a chunk and an accumulator are; this crate
//! defines how chunks actually get run: three `Executor` implementations
//! of increasing concurrency (`IterativeExecutor`, `PoolExecutor`,
//! `ClusterExecutor`), the `FuturesHolder`/`TaskHandle` machinery they
//! share, the metadata preprocessor, and `Runner`, which wires all of it
//! together end to end.

pub mod cluster;
pub mod executor;
pub mod futures_holder;
pub mod handle;
pub mod metrics;
pub mod pool;
pub mod preprocessor;
pub mod runner;
pub mod traits;

pub use cluster::{ClusterBackend, ClusterExecutor, InProcessClusterBackend};
pub use executor::{Executor, IterativeExecutor};
pub use handle::TaskHandle;
pub use metrics::RunMetrics;
pub use pool::PoolExecutor;
pub use runner::{RunOutput, Runner};
pub use traits::{EventReader, MetadataProbe, UserProcessor};
