//! Monte Carlo batch binary for the Unrest simulation.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments (clap): an optional config path (default
//!    `unrest-config.yaml`), `--benchmark`, and `--seed` / `--trials`
//!    overrides that also read `UNREST_SEED` / `UNREST_TRIALS`
//! 2. Load configuration, falling back to defaults if the file is missing
//! 3. Initialize structured logging (tracing) from the `logging` section
//! 4. Fix the batch seed (`--seed`, the config file, or the OS)
//! 5. Build the model template: population, network, cached lookups
//! 6. Run the batch (or the benchmark) on the rayon pool
//! 7. Print the JSON summary to stdout

mod error;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unrest_core::{LoggingConfig, ProtestModel, SimulationConfig, benchmark, run_batch};

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "unrest-config.yaml";

/// Repetitions timed by `--benchmark`.
const BENCHMARK_REPETITIONS: usize = 20;

/// Unrest engine: run a Monte Carlo batch of protest simulations
#[derive(Parser, Debug)]
#[command(name = "unrest-engine")]
#[command(about = "Monte Carlo batch runner for the Unrest collective-action simulation")]
#[command(version)]
struct Args {
    /// YAML configuration file; built-in defaults apply if it is missing
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Time repeated trials instead of running the batch
    #[arg(long)]
    benchmark: bool,

    /// Batch seed, overriding the config file
    #[arg(long, env = "UNREST_SEED")]
    seed: Option<u64>,

    /// Trials per batch, overriding the config file
    #[arg(long, env = "UNREST_TRIALS")]
    trials: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config =
        load_config(&args).with_context(|| format!("loading {}", args.config.display()))?;
    init_logging(&config.logging);
    info!(
        config_path = %args.config.display(),
        agents = config.population.size,
        topology = ?config.network.topology,
        trials = config.run.trials,
        days = config.run.days,
        "unrest-engine starting"
    );

    let output = run(config, args.benchmark).context("simulation run failed")?;
    println!("{output}");
    Ok(())
}

/// Build the template and run the batch or benchmark. Returns the JSON
/// document to print.
fn run(mut config: SimulationConfig, bench: bool) -> Result<String, EngineError> {
    let seed = config.seed.unwrap_or_else(rand::random);
    config.seed = Some(seed);
    info!(seed, "Batch seed fixed");

    let template = ProtestModel::new(&config)?;

    if bench {
        let report = benchmark(
            &template,
            config.run.days,
            BENCHMARK_REPETITIONS,
            config.run.context,
            seed,
        )?;
        info!(
            ms_per_trial = report.ms_per_trial,
            repetitions = report.repetitions,
            "Benchmark finished"
        );
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let summary = run_batch(&template, &config.run, seed)?;
    info!(
        batch_id = %summary.batch_id,
        p50_final_participation = summary.final_participation.p50,
        p95_peak_participation = summary.peak_participation.p95,
        cascade_probability = summary.cascade_probability,
        "Batch finished"
    );
    Ok(serde_json::to_string_pretty(&summary)?)
}

/// Load configuration from `args.config`, or defaults if it does not
/// exist, then apply the command-line overrides.
fn load_config(args: &Args) -> Result<SimulationConfig, EngineError> {
    let mut config = if args.config.exists() {
        SimulationConfig::from_file(&args.config)?
    } else {
        SimulationConfig::default()
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(trials) = args.trials {
        config.run.trials = trials;
    }
    config.validate()?;
    Ok(config)
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("unrest-engine").chain(list.iter().copied()))
    }

    #[test]
    fn no_arguments_use_default_path() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!parsed.benchmark);
    }

    #[test]
    fn path_and_flag_in_any_order() {
        let parsed = args(&["--benchmark", "custom.yaml"]).unwrap();
        assert_eq!(parsed.config, PathBuf::from("custom.yaml"));
        assert!(parsed.benchmark);

        let parsed = args(&["custom.yaml", "--benchmark"]).unwrap();
        assert_eq!(parsed.config, PathBuf::from("custom.yaml"));
        assert!(parsed.benchmark);
    }

    #[test]
    fn bad_usage_is_rejected() {
        assert!(args(&["--fast"]).is_err());
        assert!(args(&["a.yaml", "b.yaml"]).is_err());
        assert!(args(&["--seed", "not-a-number"]).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults_with_overrides() {
        let parsed =
            args(&["definitely-not-here.yaml", "--seed", "42", "--trials", "5"]).unwrap();
        let config = load_config(&parsed).unwrap();
        assert_eq!(config.population.size, 10_000);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.run.trials, 5);
    }

    #[test]
    fn zero_trials_fail_validation() {
        let parsed = args(&["definitely-not-here.yaml", "--trials", "0"]).unwrap();
        assert!(matches!(load_config(&parsed), Err(EngineError::Config { .. })));
    }
}
