//! Preprocessor — populates FileMeta metadata via MetadataProbe before
//! chunking (spec §4.3).
//!
//! Dispatch is its own small semaphore-bounded `spawn_blocking` loop
//! (grounded on `compute_executor.rs`'s pattern) rather than a detour
//! through the `Executor` trait, since a probe task maps `FileMeta →
//! FileMeta`, not `WorkItem → Accumulator`.

use std::sync::Arc;

use tokio::sync::Semaphore;

use runner_core::cache::MetadataCache;
use runner_core::error::RunnerError;
use runner_core::filemeta::{FileMeta, Metadata};
use runner_core::retry::RetryDriver;

use crate::traits::MetadataProbe;

#[derive(Debug, Clone, Copy)]
pub struct PreprocessConfig {
    pub workers: usize,
    pub align_clusters: bool,
    pub skip_bad_files: bool,
    pub retries: u32,
}

/// Populate every not-yet-ready `FileMeta` via `probe`, merge newly
/// discovered metadata into `cache`, and filter out files that are still
/// not ready afterward (dropped under `skip_bad_files`, fatal otherwise).
pub async fn preprocess<P>(
    probe: Arc<P>,
    mut filemetas: Vec<FileMeta>,
    cache: &mut MetadataCache,
    config: &PreprocessConfig,
) -> Result<Vec<FileMeta>, RunnerError>
where
    P: MetadataProbe + 'static,
{
    for fm in filemetas.iter_mut() {
        fm.maybe_populate(cache);
    }

    let retry = RetryDriver::new(config.retries, config.skip_bad_files);
    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let require_clusters = config.align_clusters;

    let mut handles = Vec::new();
    for (idx, fm) in filemetas.iter().enumerate() {
        if fm.populated(require_clusters) {
            continue;
        }
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let probe = probe.clone();
        let dataset = fm.dataset.clone();
        let filename = fm.filename.clone();
        let treename = fm.treename.clone();
        let join = tokio::task::spawn_blocking(move || {
            let outcome = retry.run(|| probe.probe(&dataset, &filename, &treename));
            drop(permit);
            (idx, outcome)
        });
        handles.push(join);
    }

    for join in handles {
        let (idx, outcome) = join
            .await
            .map_err(|e| RunnerError::Configuration(format!("preprocessing task panicked: {e}")))?;
        if let Some(probed) = outcome? {
            let mut metadata = Metadata::new();
            metadata.insert("numentries".into(), probed.numentries.into());
            metadata.insert("uuid".into(), hex::encode(&probed.uuid).into());
            if let Some(clusters) = probed.clusters {
                metadata.insert(
                    "clusters".into(),
                    serde_json::Value::Array(clusters.into_iter().map(Into::into).collect()),
                );
            }
            for (k, v) in filemetas[idx].user_metadata() {
                metadata.entry(k).or_insert(v);
            }
            filemetas[idx].metadata = Some(metadata.clone());
            cache.put(&filemetas[idx], metadata);
        }
        // `None` means the probe was skipped under the bad-file policy;
        // the file stays not-ready and is dropped by the filter below.
    }

    Ok(filemetas.into_iter().filter(|fm| fm.populated(require_clusters)).collect())
}
