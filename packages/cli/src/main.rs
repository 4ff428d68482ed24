#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the ward flow toolchain.
//!
//! Uses `indicatif-log-bridge` (via [`ward_flow_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use ward_flow_cli_utils::MultiProgress;
use ward_flow_pipeline::config::DEFAULT_CONFIG_FILE;
use ward_flow_pipeline::{PipelineConfig, StageProgress, load_config};

#[derive(Parser)]
#[command(name = "ward_flow", about = "Bike-share ward origin-destination analysis")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Override the output directory from the config file
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Override the number of worker threads used for ward assignment
    #[arg(long, global = true)]
    threads: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, assign, aggregate every partition, and write all output tables
    Run,
    /// Clean and assign only, then print the data-quality summary as JSON
    Quality,
    /// Clean and roll up bicycle utilization and fleet economics
    Utilization {
        /// Restrict the rollup to trips starting in this year
        #[arg(long)]
        year: Option<i32>,
        /// Number of top-earning bicycles to list
        #[arg(long, default_value = "5")]
        top: usize,
    },
}

fn stage_progress(multi: &MultiProgress) -> impl StageProgress + '_ {
    move |name: &str| ward_flow_cli_utils::stage_bar(multi, name)
}

fn configure(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&cli.config)?;
    if let Some(dir) = &cli.output_dir {
        config.output.dir.clone_from(dir);
    }
    if let Some(threads) = cli.threads {
        config.assign.threads = Some(threads);
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ward_flow_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = configure(&cli)?;
    let progress = stage_progress(&multi);
    let start = Instant::now();

    match cli.command {
        Commands::Run => {
            let output = ward_flow_pipeline::run(&config, &progress)?;
            log::info!(
                "Wrote {} partitions to {}",
                output.partitions.len(),
                config.output.dir.display()
            );
        }
        Commands::Quality => {
            let summary = ward_flow_pipeline::quality(&config, &progress)?;
            println!("{}", summary.to_json()?);
        }
        Commands::Utilization { year, top } => {
            if year.is_some() {
                config.economics.year = year;
            }
            let (quality, report) = ward_flow_pipeline::utilization_report(&config, &progress)?;
            let summary = &report.summary;

            println!(
                "Records:         {} kept of {} ({} unreadable, {} missing coordinates, {} malformed timestamps)",
                quality.kept,
                quality.total_records,
                quality.unreadable_rows,
                quality.missing_coordinate,
                quality.malformed_timestamp,
            );
            println!("Bicycles:        {}", summary.fleet_size);
            if let Some(dist) = &summary.utilization {
                println!(
                    "Utilization:     mean {:.2}%, median {:.2}%, min {:.2}%, max {:.2}%",
                    dist.mean, dist.median, dist.min, dist.max
                );
            }
            println!("Revenue:         ${:.2}", summary.total_revenue);
            println!(
                "Cost:            ${:.2} (${:.2} per bicycle)",
                summary.total_cost, summary.cost_per_bike
            );
            println!("Margin:          ${:.2}", summary.margin);
            println!();
            println!("{:<12} {:>12} {:>12} {:>8}", "BIKE ID", "MINUTES", "REVENUE", "UTIL %");
            println!("{}", "-".repeat(47));
            for bike in report.top_earners(top) {
                println!(
                    "{:<12} {:>12.1} {:>12.2} {:>8}",
                    bike.vehicle_id,
                    bike.ride_minutes,
                    bike.revenue,
                    bike.utilization_pct
                        .map_or_else(|| "-".to_string(), |p| format!("{p:.2}")),
                );
            }
        }
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
