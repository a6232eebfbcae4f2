//! runner-cli — command-line front end for the word-count demo runner.

use anyhow::{Context, Result};

mod cmd;
mod demo;

use cmd::run::{cmd_run, ExecutorKind, RunArgs};

fn print_usage() {
    println!("Usage: runner-cli run <fileset.json> [options]");
    println!();
    println!("Options:");
    println!("  --treename <name>       Default tree/collection name (default: lines)");
    println!("  --chunksize <n>         Target entries per chunk (default: 100000)");
    println!("  --maxchunks <n>         Cap chunks per dataset");
    println!("  --executor <kind>       iterative | pool (default: pool)");
    println!("  --workers <n>           Pool executor worker count (default: available parallelism)");
    println!("  --skip-bad-files        Drop unreadable files instead of aborting the run");
    println!("  --save-metrics          Attach per-chunk metrics to the output");
    println!("  --retries <n>           Retries for probe and read failures (default: 3)");
    println!("  --top <n>               Number of words to print (default: 10)");
    println!();
    println!("Examples:");
    println!("  runner-cli run fileset.json");
    println!("  runner-cli run fileset.json --executor iterative --top 20");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    match arg_refs.as_slice() {
        ["run", fileset_path, rest @ ..] => {
            let run_args = parse_run_args(fileset_path, rest)?;
            cmd_run(run_args).await
        }
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_run_args(fileset_path: &str, rest: &[&str]) -> Result<RunArgs> {
    let mut run_args = RunArgs {
        fileset_path: fileset_path.to_string(),
        ..RunArgs::default()
    };

    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            "--treename" => {
                i += 1;
                run_args.default_treename = Some(next_value(rest, i, "--treename")?.to_string());
            }
            "--chunksize" => {
                i += 1;
                run_args.chunksize = next_value(rest, i, "--chunksize")?
                    .parse()
                    .context("--chunksize must be a number")?;
            }
            "--maxchunks" => {
                i += 1;
                run_args.maxchunks = Some(
                    next_value(rest, i, "--maxchunks")?
                        .parse()
                        .context("--maxchunks must be a number")?,
                );
            }
            "--executor" => {
                i += 1;
                run_args.executor = match next_value(rest, i, "--executor")? {
                    "iterative" => ExecutorKind::Iterative,
                    "pool" => ExecutorKind::Pool,
                    other => anyhow::bail!("unknown executor kind: {other}"),
                };
            }
            "--workers" => {
                i += 1;
                run_args.workers = next_value(rest, i, "--workers")?
                    .parse()
                    .context("--workers must be a number")?;
            }
            "--skip-bad-files" => {
                run_args.skip_bad_files = true;
            }
            "--save-metrics" => {
                run_args.save_metrics = true;
            }
            "--retries" => {
                i += 1;
                run_args.retries = next_value(rest, i, "--retries")?
                    .parse()
                    .context("--retries must be a number")?;
            }
            "--top" => {
                i += 1;
                run_args.top = next_value(rest, i, "--top")?
                    .parse()
                    .context("--top must be a number")?;
            }
            other => anyhow::bail!("unknown option: {other}"),
        }
        i += 1;
    }

    Ok(run_args)
}

fn next_value<'a>(rest: &[&'a str], i: usize, flag: &str) -> Result<&'a str> {
    rest.get(i).copied().with_context(|| format!("{flag} requires a value"))
}
