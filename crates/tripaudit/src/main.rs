// crates/tripaudit/src/main.rs

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tripaudit_core::config::RunConfig;
use tripaudit_core::outputs::write_outputs;
use tripaudit_core::pipeline::{run_batch, RunSummary};
use tripaudit_parser::{detect_batch, read_batch, SensorField, TelemetryBatch};

/// A CLI for the vehicle telematics audit pipeline
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit one telemetry batch and write the cleaned/rejected/metrics artifacts
    Run(RunArgs),
    /// Detect and print a batch's schema without running the audit
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input CSV batch
    #[arg(short, long)]
    input: PathBuf,
    /// Directory the four output artifacts are written into
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
    /// TOML file overriding the gap threshold and sensor ranges
    #[arg(long)]
    config: Option<PathBuf>,
    /// Gap threshold in seconds, taking precedence over the config file
    #[arg(long)]
    gap_threshold: Option<f64>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Input CSV batch
    #[arg(short, long)]
    input: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Schema(args) => handle_schema(args),
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(threshold) = args.gap_threshold {
        config.gap_threshold_s = threshold;
    }

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input batch {}", args.input.display()))?;

    let outcome = run_batch(&content, &config)?;
    write_outputs(&args.output_dir, &outcome)?;

    print_summary(&outcome.summary);
    info!(directory = %args.output_dir.display(), "Audit run finished");
    Ok(())
}

fn handle_schema(args: SchemaArgs) -> Result<()> {
    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input batch {}", args.input.display()))?;
    let batch = detect_batch(read_batch(&content)?)?;

    println!("Schema: {}", batch.kind());
    println!("Rows: {}", batch.row_count());
    println!("Resolved columns:");
    match &batch {
        TelemetryBatch::Timeseries(batch) => {
            if let Some(idx) = batch.layout.trip_id {
                println!("  trip_id <- {}", batch.columns[idx]);
            }
            println!("  timestamp <- {}", batch.columns[batch.layout.timestamp]);
            for field in SensorField::ALL {
                if let Some(idx) = batch.layout.sensor(field) {
                    println!("  {field} <- {}", batch.columns[idx]);
                }
            }
        }
        TelemetryBatch::TripAggregates(batch) => {
            println!("  trip_id <- {}", batch.columns[batch.layout.trip_id]);
            if let Some((idx, unit)) = batch.layout.duration {
                println!("  duration_s ({unit:?}) <- {}", batch.columns[idx]);
            }
            let resolved = [
                ("distance_km_est", batch.layout.distance_km),
                ("avg_speed_kmh", batch.layout.avg_speed),
                ("max_speed_kmh", batch.layout.max_speed),
                ("max_motor_temp_c", batch.layout.max_motor_temp),
                ("max_cell_temp_c", batch.layout.max_cell_temp),
                ("energy_consumed_kwh", batch.layout.energy_kwh),
            ];
            for (label, idx) in resolved {
                if let Some(idx) = idx {
                    println!("  {label} <- {}", batch.columns[idx]);
                }
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Schema".to_string(), summary.schema.to_string()]);
    table.add_row(vec!["Input rows".to_string(), summary.input_rows.to_string()]);
    table.add_row(vec![
        "Rejected: missing_trip_id".to_string(),
        summary.rejected_missing_trip_id.to_string(),
    ]);
    table.add_row(vec![
        "Rejected: invalid_timestamp".to_string(),
        summary.rejected_invalid_timestamp.to_string(),
    ]);
    table.add_row(vec![
        "Rejected: all_sensors_invalid".to_string(),
        summary.rejected_all_sensors_invalid.to_string(),
    ]);
    table.add_row(vec![
        "Salvaged rows".to_string(),
        summary.salvaged_rows.to_string(),
    ]);
    table.add_row(vec![
        "Salvaged fields".to_string(),
        summary.salvaged_fields.to_string(),
    ]);
    table.add_row(vec!["Trips".to_string(), summary.trip_count.to_string()]);
    table.add_row(vec!["Gaps".to_string(), summary.gap_count.to_string()]);

    println!("\n--- Audit Summary ---");
    println!("{table}");
    println!("  ✅ Accepted: {}", summary.accepted_rows);
    println!("  ⚠️  Rejected: {}", summary.rejected_rows);
}
