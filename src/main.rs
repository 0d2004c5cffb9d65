#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hypothesizer::{run_experiments, LockedMap, ProbeConfig, ProbeMap, RacyMap, RunReport};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

/// Which map implementations to put under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MapChoice {
    /// Memory-safe map whose writers can overwrite each other
    Racy,
    /// Map guarded by a reader/writer lock
    Locked,
    /// Racy first, then locked
    All,
}

#[derive(Parser, Debug)]
#[command(
    name = "hypothesizer",
    about = "Race two writers against a map and check it stays consistent"
)]
struct Cli {
    /// Maximum number of trials per map
    #[arg(long, default_value_t = hypothesizer::config::DEFAULT_MAX_TRIES)]
    tries: u64,

    #[arg(long, value_enum, default_value_t = MapChoice::All)]
    map: MapChoice,

    /// Pause inside each racy insertion, in microseconds
    #[arg(long, default_value_t = 0)]
    stall_us: u64,

    /// Also fail a trial when a key holds the wrong value
    #[arg(long)]
    check_values: bool,

    /// Seconds an idle pool worker waits before exiting
    #[arg(long, default_value_t = 60)]
    keep_alive_secs: u64,

    /// Increase verbosity (-v=info, -vv=debug, -vvv=trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(error) = run(&cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = ProbeConfig::default()
        .with_max_tries(cli.tries)
        .with_check_values(cli.check_values)
        .with_keep_alive(Duration::from_secs(cli.keep_alive_secs));

    if matches!(cli.map, MapChoice::Racy | MapChoice::All) {
        let stall = Duration::from_micros(cli.stall_us);
        probe("RacyMap", RacyMap::with_stall(stall), &config)?;
    }
    if matches!(cli.map, MapChoice::Locked | MapChoice::All) {
        probe("LockedMap", LockedMap::new(), &config)?;
    }
    Ok(())
}

fn probe<M: ProbeMap + 'static>(name: &str, map: M, config: &ProbeConfig) -> Result<()> {
    println!("---Running hypothesizer on a {name}");
    let report = run_experiments(Arc::new(map), config.clone())
        .with_context(|| format!("trial run against {name} aborted"))?;

    if let RunReport::Corrupted { verdict, .. } = &report {
        if verdict.size_corrupt {
            println!(
                "Experiment failure because size has become corrupt keyCount = {}, size = {}",
                verdict.key_count, verdict.reported_len
            );
        }
        for key in &verdict.lost_keys {
            println!("Experiment failure because put has been lost for item with key = {key}");
        }
        for key in &verdict.mismatched_keys {
            println!("Experiment failure because value is incorrect for item with key = {key}");
        }
    }
    println!("{report}\n");
    Ok(())
}
