use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use crop_et::config::{parse_cell_list, parse_class_list, ConfigOverrides};
use crop_et::{run, RunConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "run_cet",
    about = "Compute daily basal crop coefficients for every ET cell of a project"
)]
struct Args {
    /// Project configuration file (TOML)
    config: PathBuf,

    /// First simulated day, YYYY-MM-DD
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last simulated day, YYYY-MM-DD
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Crop classes to run, e.g. 3,7-9
    #[arg(long)]
    crops: Option<String>,

    /// Cell IDs to run, comma separated
    #[arg(long)]
    cells: Option<String>,

    /// Log filter, e.g. info or crop_et=debug
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&args.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run_cet(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Failed cells are reported but do not fail the process; only load errors do.
fn run_cet(args: Args) -> Result<()> {
    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let crop_classes = args
        .crops
        .as_deref()
        .map(parse_class_list)
        .transpose()
        .context("parsing --crops")?;
    config.apply_overrides(ConfigOverrides {
        start_date: args.start,
        end_date: args.end,
        crop_classes,
        cell_ids: args.cells.as_deref().map(parse_cell_list),
    });

    let summary = run(&config).context("run aborted")?;
    for (cell_id, err) in &summary.failed {
        eprintln!("{cell_id}: {}: {err}", err.kind());
    }
    println!(
        "{} cells completed, {} failed",
        summary.completed.len(),
        summary.failed.len()
    );
    Ok(())
}
