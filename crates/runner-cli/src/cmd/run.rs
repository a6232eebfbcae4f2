//! `runner-cli run` — drive the word-count demo `Runner` over a JSON
//! fileset from the command line.

use std::sync::Arc;

use anyhow::{Context, Result};

use runner_core::config::RunnerConfig;
use runner_core::fileset::Fileset;
use runner_exec::{IterativeExecutor, PoolExecutor, Runner};

use crate::demo::{DemoProbe, DemoReader, WordCountProcessor};

pub struct RunArgs {
    pub fileset_path: String,
    pub default_treename: Option<String>,
    pub chunksize: u64,
    pub maxchunks: Option<usize>,
    pub executor: ExecutorKind,
    pub workers: usize,
    pub skip_bad_files: bool,
    pub save_metrics: bool,
    pub retries: u32,
    pub top: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    Iterative,
    Pool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            fileset_path: String::new(),
            default_treename: Some("lines".to_string()),
            chunksize: 100_000,
            maxchunks: None,
            executor: ExecutorKind::Pool,
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            skip_bad_files: false,
            save_metrics: false,
            retries: 3,
            top: 10,
        }
    }
}

pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.fileset_path)
        .with_context(|| format!("reading fileset file {:?}", args.fileset_path))?;
    let fileset: Fileset = serde_json::from_str(&contents).context("fileset JSON did not match the expected shape")?;

    let mut config = RunnerConfig::default();
    config.chunksize = args.chunksize;
    config.maxchunks = args.maxchunks;
    config.skip_bad_files = args.skip_bad_files;
    config.save_metrics = args.save_metrics;
    config.retries = args.retries;

    let probe = Arc::new(DemoProbe);
    let reader = Arc::new(DemoReader);
    let processor = Arc::new(WordCountProcessor);

    let output = match args.executor {
        ExecutorKind::Iterative => {
            let runner = Runner::new(probe, reader, IterativeExecutor, config);
            runner.run(&fileset, args.default_treename.as_deref(), processor).await?
        }
        ExecutorKind::Pool => {
            let runner = Runner::new(probe, reader, PoolExecutor::new(args.workers), config);
            runner.run(&fileset, args.default_treename.as_deref(), processor).await?
        }
    };

    let mut by_count: Vec<(&String, &u64)> = output.accumulator.0.iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    println!("═══════════════════════════════════════");
    println!("  Word Count ({} distinct words)", output.accumulator.0.len());
    println!("═══════════════════════════════════════");
    for (word, count) in by_count.into_iter().take(args.top) {
        println!("  {:<20} {}", word, count);
    }

    if let Some(metrics) = &output.metrics {
        println!();
        println!("  chunks       : {}", metrics.chunks);
        println!("  process_time : {:?}", metrics.process_time);
        println!(
            "  columns      : [{}]",
            metrics.columns.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    if let Some(error) = &output.error {
        eprintln!();
        eprintln!("  partial result only, first error: {error}");
        std::process::exit(1);
    }

    Ok(())
}
