//! End-to-end seed scenarios driving a full `Runner` over in-memory
//! probe/reader fixtures.

use std::sync::Arc;

use runner_core::config::RunnerConfig;
use runner_exec::{IterativeExecutor, PoolExecutor, Runner};

use crate::common::*;

#[tokio::test]
async fn single_small_file_produces_one_chunk() {
    let probe = Arc::new(CountingProbe::new(50));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 100;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "f.root");
    let out = runner
        .run::<Counter, _>(&fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    assert_eq!(out.accumulator, Counter(1));
}

#[tokio::test]
async fn chunk_split_produces_three_chunks_of_expected_lengths() {
    let probe = Arc::new(CountingProbe::new(250));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 100;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "f.root");
    let out = runner
        .run::<Lengths, _>(&fileset, Some("T"), Arc::new(LengthProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    assert_eq!(out.accumulator.0, vec![83, 83, 84]);
}

#[tokio::test]
async fn cluster_aligned_chunks_respect_cluster_boundaries() {
    let probe = Arc::new(CountingProbe::new(150).with_clusters(vec![0, 40, 90, 150]));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 50;
    config.align_clusters = true;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "f.root");
    let out = runner
        .run::<Lengths, _>(&fileset, Some("T"), Arc::new(LengthProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    assert_eq!(out.accumulator.0, vec![60, 90]);
}

#[tokio::test]
async fn maxchunks_caps_total_chunks_across_files_in_a_dataset() {
    let probe = Arc::new(CountingProbe::new(500));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 100;
    config.maxchunks = Some(3);
    config.compat_reverse = false;
    let runner = Runner::new(probe, reader, PoolExecutor::new(4), config).with_cache(fresh_cache());
    let fileset = multi_file_fileset("A", &["a.root", "b.root"]);
    let out = runner
        .run::<Counter, _>(&fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    assert_eq!(out.accumulator, Counter(3));
}

#[tokio::test]
async fn tree_reduce_with_branching_sums_every_chunk_exactly_once() {
    let probe = Arc::new(CountingProbe::new(500));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 10;
    let mut executor = PoolExecutor::new(8);
    executor.merging = Some((7, 7, 14));
    let runner = Runner::new(probe, reader, executor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "f.root");
    let out = runner
        .run::<Counter, _>(&fileset, Some("T"), Arc::new(CountProcessor))
        .await
        .expect("run ok");
    assert!(out.error.is_none());
    assert_eq!(out.accumulator, Counter(50));
}

#[tokio::test]
async fn recoverable_failure_returns_partial_merge_and_the_triggering_error() {
    let probe = Arc::new(CountingProbe::new(100));
    let reader = Arc::new(InMemoryReader);
    let mut config = RunnerConfig::default();
    config.chunksize = 10;
    config.compat_reverse = false;
    let runner = Runner::new(probe, reader, IterativeExecutor, config).with_cache(fresh_cache());
    let fileset = single_file_fileset("A", "f.root");
    // 10 chunks of length 10, entrystarts 0..90 step 10; the fifth chunk
    // (entrystart 40) raises.
    let out = runner
        .run::<Counter, _>(&fileset, Some("T"), Arc::new(FailAtProcessor { fail_at_entrystart: 40 }))
        .await
        .expect("run returns Ok with a partial result, not Err");
    assert_eq!(out.accumulator, Counter(4));
    assert!(out.error.is_some());
}
