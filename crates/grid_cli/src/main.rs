use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use grid_control::{load_config, Pipeline};
use grid_core::{
    CaptureParams, ComparisonParams, DispersionParams, DEFAULT_SCENARIO, DEFAULT_STEPS,
    DEFAULT_WIND_SPEED,
};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "grid_cli", about = "District pollutant pipeline CLI")]
struct Cli {
    /// Pipeline config (JSON). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides `state_file` from the config.
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,
    /// Overrides `seed` from the config.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WindArgs {
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: i64,
    #[arg(long, default_value_t = DEFAULT_WIND_SPEED)]
    wind_speed: f64,
    #[arg(long, default_value = "NE")]
    wind_direction: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate baseline emissions for districts that lack them.
    Generate {
        /// Defaults to the latest year in the store.
        #[arg(long, conflicts_with = "all_years")]
        year: Option<String>,
        /// Every year already present in the store.
        #[arg(long)]
        all_years: bool,
    },
    /// Show emissions for one district, or every district of the year.
    Emissions {
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },
    /// Run the diffusion kernel.
    Disperse {
        #[command(flatten)]
        wind: WindArgs,
        #[arg(long)]
        year: Option<String>,
    },
    DispersionResults {
        #[arg(long)]
        year: Option<String>,
    },
    /// Run the capture kernel for one scenario.
    Capture {
        #[arg(long, default_value = DEFAULT_SCENARIO)]
        scenario: String,
        #[arg(long)]
        year: Option<String>,
    },
    CaptureResults {
        #[arg(long)]
        year: Option<String>,
    },
    /// Emission, dispersion and capture for one scenario.
    Workflow {
        #[arg(long, default_value = DEFAULT_SCENARIO)]
        scenario: String,
        #[arg(long)]
        year: Option<String>,
        /// Run each stage through its own kernel instead of the end-to-end kernel.
        #[arg(long)]
        staged: bool,
        #[command(flatten)]
        wind: WindArgs,
    },
    /// Compare scenarios with the end-to-end kernel.
    Compare {
        #[arg(default_values_t = ["baseline".to_string(), "tree_planting".to_string()])]
        scenarios: Vec<String>,
        #[arg(long)]
        year: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing result")?;
    println!("{text}");
    Ok(())
}

fn dispersion_params(wind: &WindArgs, year: &str) -> Result<DispersionParams> {
    DispersionParams::new(wind.steps, wind.wind_speed, &wind.wind_direction, year)
        .context("invalid dispersion parameters")
}

fn run(pipeline: &Pipeline, command: Commands) -> Result<()> {
    match command {
        Commands::Generate { all_years: true, .. } => {
            let generated = pipeline.ensure_emissions_all_years()?;
            print_json(&json!({ "success": true, "generated": generated }))
        }
        Commands::Generate { year, .. } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            let generated = pipeline.ensure_emissions(&year)?;
            print_json(&json!({ "success": true, "year": year, "generated": generated }))
        }
        Commands::Emissions { district, year } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            match district {
                Some(district) => {
                    let view = pipeline
                        .emission_for_district(&district, &year)?
                        .with_context(|| format!("no emissions for {district} in {year}"))?;
                    print_json(&view)
                }
                None => {
                    let districts = pipeline.emission_for_all_districts(&year)?;
                    print_json(&json!({
                        "year": year,
                        "total_districts": districts.len(),
                        "districts": districts,
                    }))
                }
            }
        }
        Commands::Disperse { wind, year } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            let outcome = pipeline.run_dispersion(&dispersion_params(&wind, &year)?)?;
            print_json(&outcome)
        }
        Commands::DispersionResults { year } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            let results = pipeline.dispersion_results(&year)?;
            print_json(&json!({
                "year": year,
                "total_districts": results.len(),
                "results": results,
            }))
        }
        Commands::Capture { scenario, year } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            let params = CaptureParams::new(&scenario, &year)?;
            print_json(&pipeline.run_capture(&params)?)
        }
        Commands::CaptureResults { year } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            let results = pipeline.capture_results(&year)?;
            print_json(&json!({
                "year": year,
                "total_districts": results.len(),
                "results": results,
            }))
        }
        Commands::Workflow {
            scenario,
            year,
            staged,
            wind,
        } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            if staged {
                let params = dispersion_params(&wind, &year)?;
                print_json(&pipeline.run_staged_workflow(&params, &scenario)?)
            } else {
                let params = CaptureParams::new(&scenario, &year)?;
                print_json(&pipeline.run_workflow(&params)?)
            }
        }
        Commands::Compare { scenarios, year } => {
            let year = pipeline.resolve_year(year.as_deref())?;
            let params = ComparisonParams::new(&scenarios, &year)?;
            print_json(&pipeline.compare_scenarios(&params)?)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(state_file) = cli.state_file {
        config.state_file = state_file;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    tracing::debug!(state_file = %config.state_file.display(), "loaded config");

    let pipeline = Pipeline::from_config(&config);
    run(&pipeline, cli.command)
}
