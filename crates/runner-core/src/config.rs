//! Extension-point configuration.
//!
//! The runner core mandates no on-disk state. An optional TOML file gives
//! backend-specific extensions a place to live; its schema is theirs to
//! define, so we parse it into a generic `toml::Table` and let callers
//! pull out what they need.
//!
//! Resolution order: `$HOME/.runner.toml`, then
//! `$_CONDOR_SCRATCH_DIR/.runner.toml`, matching the original `coffea`
//! `Runner.read_coffea_config` lookup.

use std::path::PathBuf;

/// Parsed extension config, or an empty table if no file was found.
#[derive(Debug, Clone, Default)]
pub struct ExtensionConfig {
    pub table: toml::Table,
}

fn config_path() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".runner.toml"));
    }
    if let Ok(scratch) = std::env::var("_CONDOR_SCRATCH_DIR") {
        return Some(PathBuf::from(scratch).join(".runner.toml"));
    }
    None
}

impl ExtensionConfig {
    /// Read the extension config from its well-known location, if present.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match contents.parse::<toml::Table>() {
            Ok(table) => Self { table },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse extension config, ignoring");
                Self::default()
            }
        }
    }
}

/// Per-run configuration for a `Runner`. Executor instances and fileset are
/// passed separately; this holds the scalar options from spec §4.7.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Target entries per WorkItem.
    pub chunksize: u64,
    /// Cap chunks per dataset. `None` = no cap.
    pub maxchunks: Option<usize>,
    /// Route I/O errors through the bad-file policy instead of aborting.
    pub skip_bad_files: bool,
    /// Bounds each chunk's `EventReader::open` call, seconds. Not applied
    /// to metadata probing, which disables per-task timeouts the same way
    /// the original's preprocessing pre-executor clone does.
    pub read_timeout: u64,
    /// Require and honor cluster offsets when chunking.
    pub align_clusters: bool,
    /// Attach per-chunk metrics to the result.
    pub save_metrics: bool,
    /// LZ4 level for the serialized user processor. `None` = no compression.
    pub processor_compression: Option<u32>,
    /// Output format. Only `Root` has a working reader; `Parquet` is
    /// reserved per spec §9's Open Question.
    pub format: Format,
    /// Reverse the fileset list before chunking, matching legacy ordering
    /// (spec §4.3's "Open question" on the reverse — kept behind this flag).
    pub compat_reverse: bool,
    /// Retries given to every `RetryDriver` the runner builds (probe and
    /// work function alike).
    pub retries: u32,
    /// Concurrency for the preprocessing probe loop, independent of the
    /// main executor's own worker count.
    pub preprocess_workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Root,
    Parquet,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            chunksize: 100_000,
            maxchunks: None,
            skip_bad_files: false,
            read_timeout: 60,
            align_clusters: false,
            save_metrics: false,
            processor_compression: Some(1),
            format: Format::Root,
            compat_reverse: true,
            retries: 3,
            preprocess_workers: 4,
        }
    }
}
