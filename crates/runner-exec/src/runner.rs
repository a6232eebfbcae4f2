//! Runner — top-level orchestrator (spec §4.7): normalize the fileset,
//! preprocess metadata, chunk, dispatch to an `Executor`, and finalize.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use runner_core::accumulator::Accumulator;
use runner_core::cache::{global_metadata_cache, SharedMetadataCache};
use runner_core::config::{Format, RunnerConfig};
use runner_core::error::RunnerError;
use runner_core::filemeta::FileMeta;
use runner_core::fileset::{self, Fileset};
use runner_core::retry::RetryDriver;
use runner_core::workitem::{Chunker, WorkItem};

use crate::executor::Executor;
use crate::metrics::RunMetrics;
use crate::preprocessor::{self, PreprocessConfig};
use crate::traits::{EventReader, EventsView, UserProcessor};

/// Outcome of one `Runner::run` call (spec §4.7 step 8).
pub struct RunOutput<A> {
    pub accumulator: A,
    /// The first unrecoverable error, if the executor returned one
    /// alongside a best-effort partial accumulator.
    pub error: Option<RunnerError>,
    pub metrics: Option<RunMetrics>,
}

/// Composes every piece in `runner-core`/`runner-exec` end-to-end.
/// Generic over the probe, reader, and executor so a caller can swap in
/// `PoolExecutor`, `ClusterExecutor`, or a test double without the
/// orchestration logic changing.
pub struct Runner<P, R, E> {
    probe: Arc<P>,
    reader: Arc<R>,
    executor: E,
    config: RunnerConfig,
    cache: SharedMetadataCache,
    schema: Option<Arc<Vec<String>>>,
}

impl<P, R, E> Runner<P, R, E>
where
    E: Executor,
{
    pub fn new(probe: Arc<P>, reader: Arc<R>, executor: E, config: RunnerConfig) -> Self {
        Self {
            probe,
            reader,
            executor,
            config,
            cache: global_metadata_cache(),
            schema: None,
        }
    }

    /// Use an explicit metadata cache instead of the process-global default.
    pub fn with_cache(mut self, cache: SharedMetadataCache) -> Self {
        self.cache = cache;
        self
    }

    /// Event-decoding schema handed to every `EventReader::open` call.
    pub fn with_schema(mut self, schema: Vec<String>) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }
}

impl<P, R, E> Runner<P, R, E>
where
    P: crate::traits::MetadataProbe + 'static,
    R: EventReader + 'static,
    E: Executor,
{
    /// Run `processor` over `fileset`. `default_treename` covers fileset
    /// entries that name neither a per-file nor a per-dataset tree.
    pub async fn run<A, U>(
        &self,
        fileset: &Fileset,
        default_treename: Option<&str>,
        processor: Arc<U>,
    ) -> Result<RunOutput<A>, RunnerError>
    where
        A: Accumulator,
        U: UserProcessor<A> + 'static,
    {
        if self.config.format == Format::Parquet {
            return Err(RunnerError::Configuration("parquet format is not implemented yet".into()));
        }

        // Steps 1-2: normalize, then fill in whatever the cache already knows.
        let mut filemetas = fileset::normalize(fileset, default_treename)?;
        {
            let mut cache = self.cache.lock().await;
            for fm in filemetas.iter_mut() {
                fm.maybe_populate(&mut cache);
            }
        }

        // Steps 3-4: preprocess and filter bad files.
        let preprocess_config = PreprocessConfig {
            workers: self.config.preprocess_workers,
            align_clusters: self.config.align_clusters,
            skip_bad_files: self.config.skip_bad_files,
            retries: self.config.retries,
        };
        let ready = {
            let mut cache = self.cache.lock().await;
            preprocessor::preprocess(self.probe.clone(), filemetas, &mut cache, &preprocess_config).await?
        };

        // Step 5: chunk, respecting maxchunks per dataset.
        let chunks = generate_chunks(ready, &self.config);
        if chunks.is_empty() {
            let mut acc = A::zero();
            processor.postprocess(&mut acc);
            return Ok(RunOutput {
                accumulator: acc,
                error: None,
                metrics: self.config.save_metrics.then(RunMetrics::default),
            });
        }

        // Step 6-7: build the retrying work function and dispatch.
        let metrics_acc = self
            .config
            .save_metrics
            .then(|| Arc::new(std::sync::Mutex::new(RunMetrics::default())));
        let work_function = make_work_function(
            self.reader.clone(),
            processor.clone(),
            self.schema.clone(),
            metrics_acc.clone(),
            self.config.retries,
            self.config.skip_bad_files,
            self.config.read_timeout,
        );

        let (mut acc, error) = self.executor.execute(chunks, work_function, A::zero()).await;

        // Step 8: postprocess, attach metrics, return.
        processor.postprocess(&mut acc);
        let metrics = metrics_acc.map(|m| {
            Arc::try_unwrap(m)
                .map(|mutex| mutex.into_inner().expect("metrics mutex poisoned"))
                .unwrap_or_else(|arc| arc.lock().expect("metrics mutex poisoned").clone())
        });

        Ok(RunOutput {
            accumulator: acc,
            error,
            metrics,
        })
    }
}

/// Build the per-chunk closure an `Executor` drives: open the file, run
/// the user processor, and fold the retry policy around both (spec §4.7
/// "The work function, per chunk").
fn make_work_function<R, U, A>(
    reader: Arc<R>,
    processor: Arc<U>,
    schema: Option<Arc<Vec<String>>>,
    metrics: Option<Arc<std::sync::Mutex<RunMetrics>>>,
    retries: u32,
    skip_bad_files: bool,
    read_timeout: u64,
) -> impl Fn(WorkItem) -> Result<A, RunnerError> + Send + Sync + Clone + 'static
where
    R: EventReader + 'static,
    U: UserProcessor<A> + 'static,
    A: Accumulator,
{
    let retry = RetryDriver::new(retries, skip_bad_files);
    move |item: WorkItem| -> Result<A, RunnerError> {
        let reader = reader.clone();
        let processor = processor.clone();
        let schema = schema.clone();
        let metrics = metrics.clone();
        let schema_slice = schema.as_deref().map(|v| v.as_slice());
        let outcome = retry.run(|| process_one_chunk(&item, &reader, &processor, schema_slice, &metrics, read_timeout))?;
        Ok(outcome.unwrap_or_else(A::zero))
    }
}

/// Bound `reader.open` by `read_timeout` seconds (spec §4.7: "open the file
/// with the read timeout"). The open runs on its own thread so a wedged
/// reader can't hang the caller past the deadline; the thread itself is
/// left to finish or fail on its own, same as the original's signal-based
/// timeout not actually killing the underlying call.
fn open_with_timeout<R>(
    reader: &Arc<R>,
    item: &WorkItem,
    schema: Option<&[String]>,
    read_timeout: u64,
) -> Result<Box<dyn EventsView>, RunnerError>
where
    R: EventReader + 'static,
{
    let reader = reader.clone();
    let item_for_thread = item.clone();
    let schema_owned = schema.map(|s| s.to_vec());
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let schema_slice = schema_owned.as_deref();
        let _ = tx.send(reader.open(&item_for_thread, schema_slice));
    });
    match rx.recv_timeout(Duration::from_secs(read_timeout)) {
        Ok(result) => result,
        Err(_) => Err(RunnerError::Timeout {
            item: Box::new(item.clone()),
            seconds: read_timeout,
        }),
    }
}

fn process_one_chunk<R, U, A>(
    item: &WorkItem,
    reader: &Arc<R>,
    processor: &U,
    schema: Option<&[String]>,
    metrics: &Option<Arc<std::sync::Mutex<RunMetrics>>>,
    read_timeout: u64,
) -> Result<A, RunnerError>
where
    R: EventReader + 'static,
    U: UserProcessor<A>,
    A: Accumulator,
{
    let start = Instant::now();
    let events = open_with_timeout(reader, item, schema, read_timeout)?;
    let result = processor
        .process(events.as_ref())
        .map_err(|e| RunnerError::User {
            item: Box::new(item.clone()),
            source: Box::new(e),
        })?;

    if let Some(metrics_acc) = metrics {
        let one = RunMetrics::one_chunk(0, events.materialized_columns(), start.elapsed());
        let mut guard = metrics_acc.lock().expect("metrics mutex poisoned");
        let existing = std::mem::take(&mut *guard);
        *guard = existing.merge(one);
    }

    Ok(result)
}

/// Expand every ready `FileMeta` into `WorkItem`s via its `Chunker`,
/// capping per-dataset output at `maxchunks` when set (spec §4.7 step 5,
/// S4). The legacy-order reverse (spec §9 Open Question) is applied first.
fn generate_chunks(mut filemetas: Vec<FileMeta>, config: &RunnerConfig) -> Vec<WorkItem> {
    if config.compat_reverse {
        filemetas.reverse();
    }

    let mut dataset_counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for fm in &filemetas {
        let mut chunker = Chunker::new(fm, config.chunksize, config.align_clusters);
        while let Some(item) = chunker.advance(None) {
            if let Some(max) = config.maxchunks {
                let count = dataset_counts.entry(fm.dataset.clone()).or_insert(0);
                if *count >= max {
                    break;
                }
                *count += 1;
            }
            out.push(item);
        }
    }
    out
}
