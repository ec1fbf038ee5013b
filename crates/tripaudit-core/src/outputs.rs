use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;
use serde::Serialize;
use tracing::info;

use tripaudit_parser::RejectedRow;

use crate::deltas::DeltaRecord;
use crate::error::Result;
use crate::metrics::TripMetrics;
use crate::pipeline::{AuditOutcome, RunSummary};

pub const CLEANED_FILENAME: &str = "cleaned_telematics.csv";
pub const REJECTED_FILENAME: &str = "rejected_telematics.csv";
pub const METRICS_FILENAME: &str = "trip_metrics.csv";
pub const RUN_REPORT_FILENAME: &str = "run_report.json";

const CLEANED_HEADER: [&str; 11] = [
    "trip_id",
    "timestamp",
    "speed_kmh",
    "motor_temp_c",
    "cell_temp_c",
    "battery_voltage_v",
    "battery_current_a",
    "soc_pct",
    "salvage_notes",
    "elapsed_since_prev_s",
    "gap_flag",
];

const METRICS_HEADER: [&str; 12] = [
    "trip_id",
    "duration_s",
    "distance_km_est",
    "gap_count",
    "record_count",
    "max_speed_kmh",
    "avg_speed_kmh",
    "max_motor_temp_c",
    "max_cell_temp_c",
    "min_battery_voltage_v",
    "max_battery_current_a",
    "energy_consumed_kwh",
];

#[derive(Serialize)]
struct CleanedCsvRow<'a> {
    trip_id: &'a str,
    timestamp: String,
    speed_kmh: Option<f64>,
    motor_temp_c: Option<f64>,
    cell_temp_c: Option<f64>,
    battery_voltage_v: Option<f64>,
    battery_current_a: Option<f64>,
    soc_pct: Option<f64>,
    salvage_notes: String,
    elapsed_since_prev_s: Option<f64>,
    gap_flag: bool,
}

/// Writes the four audit artifacts into `dir`, creating it if missing. Caller
/// must only invoke this after the whole run succeeded; a batch failure must
/// leave no files behind.
pub fn write_outputs(dir: &Path, outcome: &AuditOutcome) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_cleaned_csv(File::create(dir.join(CLEANED_FILENAME))?, &outcome.cleaned)?;
    write_rejected_csv(
        File::create(dir.join(REJECTED_FILENAME))?,
        &outcome.columns,
        &outcome.rejected,
    )?;
    write_metrics_csv(File::create(dir.join(METRICS_FILENAME))?, &outcome.metrics)?;
    write_run_report(File::create(dir.join(RUN_REPORT_FILENAME))?, &outcome.summary)?;

    info!(directory = %dir.display(), "Wrote audit artifacts");
    Ok(())
}

pub fn write_cleaned_csv<W: Write>(writer: W, cleaned: &[DeltaRecord]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(CLEANED_HEADER)?;

    for entry in cleaned {
        let record = &entry.record;
        csv_writer.serialize(CleanedCsvRow {
            trip_id: &record.trip_id,
            timestamp: record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            speed_kmh: record.speed_kmh,
            motor_temp_c: record.motor_temp_c,
            cell_temp_c: record.cell_temp_c,
            battery_voltage_v: record.battery_voltage_v,
            battery_current_a: record.battery_current_a,
            soc_pct: record.soc_pct,
            salvage_notes: record.salvage_notes.join("|"),
            elapsed_since_prev_s: entry.elapsed_since_prev_s,
            gap_flag: entry.gap_flag,
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_rejected_csv<W: Write>(
    writer: W,
    columns: &[String],
    rejected: &[RejectedRow],
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = columns.iter().map(String::as_str).collect();
    header.push("reject_reason");
    csv_writer.write_record(&header)?;

    for entry in rejected {
        let mut row: Vec<&str> = Vec::with_capacity(columns.len() + 1);
        for idx in 0..columns.len() {
            row.push(entry.row.get(idx));
        }
        row.push(entry.reason.as_str());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_metrics_csv<W: Write>(writer: W, metrics: &[TripMetrics]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(METRICS_HEADER)?;

    for entry in metrics {
        csv_writer.serialize(entry)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_run_report<W: Write>(mut writer: W, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    Ok(())
}
