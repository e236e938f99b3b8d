use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dacforge_core::aggregation::ModulePair;
use std::{path::PathBuf, time::Duration};
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod ingest;
mod plotting;
mod report;
mod workflow;

#[derive(Parser)]
#[command(name = "dacforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weekly carbon accounting and scenario simulation for a Direct Air Capture plant", long_about = None)]
struct Cli {
    /// YAML settings file (emission factors, simulation tunables, embodied inventory)
    #[arg(short, long, global = true, default_value = "dacforge.yaml")]
    settings: PathBuf,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Cycle export CSV
    #[arg(long)]
    cycles: PathBuf,

    /// Optional per-cycle energy export CSV, merged on (Cycle #, Machine)
    #[arg(long)]
    energy: Option<PathBuf>,

    /// Weekly liquefied CO2 entries CSV
    #[arg(long)]
    entries: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Net removal verdict, losses and break-even for one week
    Week {
        #[command(flatten)]
        data: DataArgs,

        /// Any date in the week (YYYY-MM-DD) or an ISO week (YYYY-Www)
        #[arg(long)]
        week: String,

        /// Restrict to one module pair (1n3 or 2n4)
        #[arg(long)]
        pair: Option<String>,
    },

    /// Weekly table with monthly, year-to-date and lifetime rollups
    Report {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,

        /// Save a weekly net removal chart (PNG)
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Monte Carlo comparison of the current and alternate thermal scenarios
    Simulate {
        #[command(flatten)]
        data: DataArgs,

        /// Overrides `simulation.iterations` from the settings file
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Fix the random seed for reproducible results
        #[arg(long)]
        seed: Option<u64>,

        /// Number of most recent complete weeks used as the sampling base
        #[arg(long, default_value_t = 12)]
        base_weeks: usize,

        /// Abort if the run takes longer than this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Write every iteration's draws to a CSV file
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Save a percentile range chart (PNG)
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// One-at-a-time ±10% sensitivity of net removal for one week
    Sensitivity {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long)]
        week: String,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn parse_pair(raw: Option<&str>) -> Result<Option<ModulePair>> {
    match raw {
        None => Ok(None),
        Some(raw) => ModulePair::classify(raw)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Unknown module pair '{}'; expected 1n3 or 2n4", raw)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("dacforge {}", env!("CARGO_PKG_VERSION"));

    let settings = config::Settings::load(&cli.settings)?;
    let source = config::ConfigurationSource::from_settings(&settings)?;

    match cli.command {
        Commands::Week { data, week, pair } => {
            let dataset = load(&data)?;
            let week = workflow::parse_week(&week)?;
            let pair = parse_pair(pair.as_deref())?;
            let result = workflow::week_report(&dataset, &source, week, pair)?;
            if cli.json {
                report::print_json(&result)?;
            } else {
                report::print_week(&result);
            }
        }
        Commands::Report {
            data,
            from,
            to,
            plot,
        } => {
            let dataset = load(&data)?;
            let result = workflow::period_report(&dataset, &source, from, to)?;
            if cli.json {
                report::print_json(&result)?;
            } else {
                report::print_period(&result);
            }
            if let Some(path) = plot {
                plotting::plot_weekly_net(&path, &result.weeks)?;
            }
        }
        Commands::Simulate {
            data,
            iterations,
            seed,
            base_weeks,
            timeout_secs,
            trace,
            plot,
        } => {
            let dataset = load(&data)?;
            let options = workflow::SimulationOptions {
                iterations,
                seed,
                base_weeks,
                trace: trace.as_deref(),
                timeout: timeout_secs.map(Duration::from_secs),
            };
            let comparison = workflow::simulate(&dataset, &source, &settings, &options)?;
            if cli.json {
                report::print_json(&comparison)?;
            } else {
                report::print_simulation(&comparison);
            }
            if let Some(path) = plot {
                plotting::plot_scenarios(&path, &comparison)?;
            }
        }
        Commands::Sensitivity { data, week } => {
            let dataset = load(&data)?;
            let week = workflow::parse_week(&week)?;
            let result = workflow::sensitivity_report(&dataset, &source, week)?;
            if cli.json {
                report::print_json(&result)?;
            } else {
                report::print_sensitivity(&result);
            }
        }
    }

    Ok(())
}

fn load(data: &DataArgs) -> Result<workflow::Dataset> {
    workflow::Dataset::load(&data.cycles, data.energy.as_deref(), &data.entries)
}
