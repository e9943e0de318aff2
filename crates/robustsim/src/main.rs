//! robustsim CLI
//!
//! Thin wrapper over `robustsim-core`.
//!
//! # Commands
//!
//! - `run`: Evaluate the probe registry and write the JSON report
//! - `grid`: List every (metric, dimension, noise cell) the run would evaluate
//! - `config`: Print the effective configuration as TOML
//!
//! Logs go to stderr; stdout carries only the requested output.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use robustsim_core::config::{Config, LogFormat};
use robustsim_core::logging::{LogConfig, LogLevel, init_logging};
use robustsim_core::{Harness, HarnessConfig};

mod probes;

/// robustsim - deterministic noise-robustness reports for similarity metrics
#[derive(Parser, Debug)]
#[command(name = "robustsim")]
#[command(version)]
#[command(about = "Measure how vector similarity functions degrade under noise")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to robustsim.toml (default: $ROBUSTSIM_CONFIG, ./robustsim.toml, user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Log format (pretty, json)
    #[arg(long, global = true, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the evaluation and write the JSON report
    Run(RunArgs),

    /// List the grid cells a run would evaluate
    Grid(GridArgs),

    /// Print the effective configuration as TOML
    Config(GridOverrides),
}

/// Harness overrides shared by `run`, `grid` and `config`.
#[derive(Args, Debug, Default)]
struct GridOverrides {
    /// Root seed
    #[arg(long)]
    seed: Option<u32>,

    /// Comma-separated vector dimensions, e.g. 64,128
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    dimensions: Option<Vec<usize>>,

    /// Base vectors per dimension
    #[arg(long = "base-vectors", value_name = "N")]
    base_vectors: Option<usize>,

    /// Candidate pool size for rank stability
    #[arg(long, value_name = "K")]
    candidates: Option<usize>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    grid: GridOverrides,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Emit the JSON report on a single line
    #[arg(long)]
    compact: bool,

    /// Pin meta.generatedAt (RFC 3339), making the report reproducible
    #[arg(long, value_parser = parse_timestamp)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
struct GridArgs {
    #[command(flatten)]
    grid: GridOverrides,

    /// Print cells as a JSON array
    #[arg(long)]
    json: bool,
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    s.parse()
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{s}': {e}"))
}

impl GridOverrides {
    fn apply(&self, harness: &mut HarnessConfig) {
        if let Some(seed) = self.seed {
            harness.seed = seed;
        }
        if let Some(dimensions) = &self.dimensions {
            harness.dimensions.clone_from(dimensions);
        }
        if let Some(count) = self.base_vectors {
            harness.base_vector_count = count;
        }
        if let Some(candidates) = self.candidates {
            harness.rank_stability_candidates = candidates;
        }
    }
}

/// Load the config file and apply command-line overrides.
fn effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    let overrides = match &cli.command {
        Commands::Run(args) => &args.grid,
        Commands::Grid(args) => &args.grid,
        Commands::Config(overrides) => overrides,
    };
    overrides.apply(&mut config.harness);
    config.harness.validate()?;

    if let Some(level) = cli.log_level {
        config.general.log_level = level.as_str().to_string();
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if cli.log_file.is_some() {
        config.general.log_file.clone_from(&cli.log_file);
    }
    if let Commands::Run(args) = &cli.command {
        if args.output.is_some() {
            config.output.path.clone_from(&args.output);
        }
        if args.pretty {
            config.output.pretty = true;
        } else if args.compact {
            config.output.pretty = false;
        }
    }
    Ok(config)
}

fn run_command(config: &Config, args: &RunArgs) -> anyhow::Result<()> {
    let registry = probes::probe_registry();
    let mut harness = Harness::new(config.harness.clone());
    if let Some(at) = args.timestamp {
        harness = harness.with_generated_at(at);
    }

    let report = harness.run(&registry);
    let digest = report.results_digest()?;

    match &config.output.path {
        Some(path) => {
            report
                .write_to(path, config.output.pretty)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), digest = %digest, "Report written");
        }
        None => {
            println!("{}", report.to_json(config.output.pretty)?);
            tracing::info!(digest = %digest, "Report written to stdout");
        }
    }
    Ok(())
}

fn grid_command(config: &Config, args: &GridArgs) -> anyhow::Result<()> {
    let registry = probes::probe_registry();
    let cells = Harness::new(config.harness.clone()).grid_cells(&registry);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
    } else {
        for cell in &cells {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                cell.metric, cell.file, cell.dimension, cell.noise_model, cell.noise_level
            );
        }
    }
    tracing::debug!(cells = cells.len(), "Grid listed");
    Ok(())
}

fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = effective_config(cli)?;

    init_logging(&LogConfig {
        level: config.general.log_level.clone(),
        format: config.general.log_format,
        file: config.general.log_file.clone(),
    })
    .context("failed to initialize logging")?;

    match &cli.command {
        Commands::Run(args) => run_command(&config, args),
        Commands::Grid(args) => grid_command(&config, args),
        Commands::Config(_) => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(remediation) = err
                .downcast_ref::<robustsim_core::Error>()
                .and_then(robustsim_core::Error::remediation)
                .or_else(|| {
                    err.downcast_ref::<robustsim_core::ConfigError>()
                        .map(robustsim_core::ConfigError::remediation)
                })
            {
                eprint!("{}", remediation.render_plain());
            }
            ExitCode::FAILURE
        }
    }
}
