//! End-to-end checks for the testable properties not already pinned down
//! by a seed scenario: retry-then-succeed, bad-file skip vs. abort, and
//! metadata-cache reuse across runs.

use std::sync::Arc;

use runner_core::config::RunnerConfig;
use runner_exec::{IterativeExecutor, Runner};

use crate::common::*;

#[tokio::test]
async fn a_flaky_chunk_contributes_exactly_once_after_retrying() {
    let probe = Arc::new(CountingProbe::new(30));
    let reader = Arc::new(FlakyReader::new(10, 2));
    let mut config = RunnerConfig::default();
    config.chunksize = 10;
    config.retries = 3;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "f.root");
    let out = runner
        .run::<Counter, _>(&fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    // 3 chunks of length 10; the middle one fails twice, then succeeds.
    assert_eq!(out.accumulator, Counter(3));
}

#[tokio::test]
async fn skip_bad_files_drops_the_file_instead_of_aborting() {
    let probe = Arc::new(CountingProbe::new(50).failing("bad.root"));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 100;
    config.skip_bad_files = true;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = multi_file_fileset("A", &["good.root", "bad.root"]);
    let out = runner
        .run::<Counter, _>(&fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    assert_eq!(out.accumulator, Counter(1));
}

#[tokio::test]
async fn without_skip_bad_files_a_bad_probe_aborts_the_run() {
    let probe = Arc::new(CountingProbe::new(50).failing("bad.root"));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 100;
    config.skip_bad_files = false;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "bad.root");
    let result = runner.run::<Counter, _>(&fileset, Some("T"), Arc::new(CountProcessor)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn overlapping_runs_share_a_cache_and_probe_each_file_once() {
    let probe = Arc::new(CountingProbe::new(20));
    let reader = Arc::new(InMemoryReader);
    let cache = fresh_cache();

    let mut config = RunnerConfig::default();
    config.chunksize = 100;

    let runner_one = Runner::new(probe.clone(), reader.clone(), IterativeExecutor, config.clone()).with_cache(cache.clone());
    let first_fileset = multi_file_fileset("A", &["shared.root", "only_a.root"]);
    runner_one
        .run::<Counter, _>(&first_fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");
    assert_eq!(probe.call_count("shared.root"), 1);
    assert_eq!(probe.call_count("only_a.root"), 1);

    let runner_two = Runner::new(probe.clone(), reader, IterativeExecutor, config).with_cache(cache);
    let second_fileset = multi_file_fileset("B", &["shared.root", "only_b.root"]);
    runner_two
        .run::<Counter, _>(&second_fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");

    // shared.root was already cached by the first run; only_b.root is new.
    assert_eq!(probe.call_count("shared.root"), 1);
    assert_eq!(probe.call_count("only_b.root"), 1);
}
