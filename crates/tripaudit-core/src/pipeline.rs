use serde::Serialize;
use tracing::{debug, info};

use tripaudit_parser::{
    detect_batch, read_batch, standardize_row, validate_row, AggregateBatch, AggregateOutcome,
    RejectReason, RejectedRow, RowOutcome, TelemetryBatch, TimeseriesBatch,
};

use crate::config::RunConfig;
use crate::deltas::{annotate_trip, DeltaRecord};
use crate::error::Result;
use crate::metrics::{aggregate_trip, TripMetrics};
use crate::trips::group_by_trip;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub schema: &'static str,
    pub input_rows: usize,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
    pub rejected_missing_trip_id: usize,
    pub rejected_invalid_timestamp: usize,
    pub rejected_all_sensors_invalid: usize,
    pub salvaged_rows: usize,
    pub salvaged_fields: usize,
    pub trip_count: usize,
    pub gap_count: usize,
}

/// Everything one audit run produces, ready for the output writers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditOutcome {
    pub columns: Vec<String>,
    pub cleaned: Vec<DeltaRecord>,
    pub rejected: Vec<RejectedRow>,
    pub metrics: Vec<TripMetrics>,
    pub summary: RunSummary,
}

/// Runs the full audit over one in-memory CSV batch. Fails before producing
/// any outcome on an invalid config, unreadable CSV, empty batch, or a column
/// set matching neither schema.
pub fn run_batch(content: &str, config: &RunConfig) -> Result<AuditOutcome> {
    config.validate()?;

    let batch = detect_batch(read_batch(content)?)?;
    info!(
        schema = batch.kind(),
        rows = batch.row_count(),
        "Detected batch schema"
    );

    let outcome = match batch {
        TelemetryBatch::Timeseries(batch) => run_timeseries(batch, config),
        TelemetryBatch::TripAggregates(batch) => run_aggregates(batch),
    };
    Ok(outcome)
}

fn run_timeseries(batch: TimeseriesBatch, config: &RunConfig) -> AuditOutcome {
    let input_rows = batch.rows.len();
    let mut accepted = Vec::new();
    let mut rejected: Vec<RejectedRow> = Vec::new();
    let mut salvaged_rows = 0;
    let mut salvaged_fields = 0;

    for row in &batch.rows {
        match validate_row(&batch.layout, row, &config.limits) {
            RowOutcome::Accepted(record) => {
                if !record.salvage_notes.is_empty() {
                    debug!(
                        line = row.line,
                        fields = record.salvage_notes.len(),
                        "Salvaged out-of-range fields"
                    );
                    salvaged_rows += 1;
                    salvaged_fields += record.salvage_notes.len();
                }
                accepted.push(record);
            }
            RowOutcome::Rejected(reject) => {
                debug!(line = reject.row.line, reason = reject.reason.as_str(), "Rejected row");
                rejected.push(reject);
            }
        }
    }

    let trips = group_by_trip(accepted);
    let trip_count = trips.len();

    let mut cleaned = Vec::new();
    let mut metrics = Vec::new();
    let mut gap_count = 0;
    for (trip_id, records) in trips {
        let annotated = annotate_trip(records, config.gap_threshold_s);
        let trip_metrics = aggregate_trip(&trip_id, &annotated);
        gap_count += trip_metrics.gap_count.unwrap_or(0);
        metrics.push(trip_metrics);
        cleaned.extend(annotated);
    }

    info!(
        accepted = cleaned.len(),
        rejected = rejected.len(),
        trips = trip_count,
        gaps = gap_count,
        "Audited raw telemetry batch"
    );

    let summary = RunSummary {
        schema: "raw_timeseries",
        input_rows,
        accepted_rows: cleaned.len(),
        rejected_rows: rejected.len(),
        rejected_missing_trip_id: count_reason(&rejected, RejectReason::MissingTripId),
        rejected_invalid_timestamp: count_reason(&rejected, RejectReason::InvalidTimestamp),
        rejected_all_sensors_invalid: count_reason(&rejected, RejectReason::AllSensorsInvalid),
        salvaged_rows,
        salvaged_fields,
        trip_count,
        gap_count,
    };

    AuditOutcome {
        columns: batch.columns,
        cleaned,
        rejected,
        metrics,
        summary,
    }
}

fn run_aggregates(batch: AggregateBatch) -> AuditOutcome {
    let input_rows = batch.rows.len();
    let mut metrics: Vec<TripMetrics> = Vec::new();
    let mut rejected = Vec::new();

    for row in &batch.rows {
        match standardize_row(&batch.layout, row) {
            AggregateOutcome::Standardized(aggregate) => metrics.push(TripMetrics::from(aggregate)),
            AggregateOutcome::Rejected(reject) => {
                debug!(line = reject.row.line, reason = reject.reason.as_str(), "Rejected row");
                rejected.push(reject);
            }
        }
    }
    metrics.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));

    info!(
        trips = metrics.len(),
        rejected = rejected.len(),
        "Standardized trip aggregate batch"
    );

    let summary = RunSummary {
        schema: "trip_aggregates",
        input_rows,
        accepted_rows: metrics.len(),
        rejected_rows: rejected.len(),
        rejected_missing_trip_id: count_reason(&rejected, RejectReason::MissingTripId),
        rejected_invalid_timestamp: 0,
        rejected_all_sensors_invalid: 0,
        salvaged_rows: 0,
        salvaged_fields: 0,
        trip_count: metrics.len(),
        gap_count: 0,
    };

    AuditOutcome {
        columns: batch.columns,
        cleaned: Vec::new(),
        rejected,
        metrics,
        summary,
    }
}

fn count_reason(rejected: &[RejectedRow], reason: RejectReason) -> usize {
    rejected
        .iter()
        .filter(|entry| entry.reason == reason)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use tripaudit_parser::BatchError;

    const RAW_BATCH: &str = "\
trip_id,timestamp,speed_kmh,motor_temp_c,cell_temp_c,battery_voltage_v,battery_current_a,soc_pct
T002,2024-03-01 09:00:00,40.0,55.0,30.0,400.0,5.0,90.0
T001,2024-03-01 08:10:01,80.0,61.0,32.0,401.0,-10.0,87.5
T001,2024-03-01 08:00:00,72.5,60.1,31.2,402.0,-12.5,88.0
,2024-03-01 08:00:30,50.0,60.0,31.0,402.0,-12.0,88.0
T001,bad-stamp,50.0,60.0,31.0,402.0,-12.0,88.0
T002,2024-03-01 09:05:00,300.0,,,,,
T002,2024-03-01 09:00:30,260.0,56.0,30.5,399.0,6.0,89.5
";

    #[test]
    fn audits_raw_batch_end_to_end() {
        let outcome = run_batch(RAW_BATCH, &RunConfig::default()).expect("run raw batch");
        let summary = &outcome.summary;

        assert_eq!(summary.schema, "raw_timeseries");
        assert_eq!(summary.input_rows, 7);
        assert_eq!(summary.accepted_rows, 4);
        assert_eq!(summary.rejected_rows, 3);
        assert_eq!(summary.rejected_missing_trip_id, 1);
        assert_eq!(summary.rejected_invalid_timestamp, 1);
        assert_eq!(summary.rejected_all_sensors_invalid, 1);
        assert_eq!(summary.salvaged_rows, 1);
        assert_eq!(summary.salvaged_fields, 1);
        assert_eq!(summary.trip_count, 2);
        assert_eq!(summary.gap_count, 1);
        assert_eq!(
            summary.accepted_rows + summary.rejected_rows,
            summary.input_rows
        );

        let trip_order: Vec<&str> = outcome
            .cleaned
            .iter()
            .map(|entry| entry.record.trip_id.as_str())
            .collect();
        assert_eq!(trip_order, ["T001", "T001", "T002", "T002"]);
        assert!(outcome.cleaned[0].record.timestamp < outcome.cleaned[1].record.timestamp);
        assert!(outcome.cleaned[2].record.timestamp < outcome.cleaned[3].record.timestamp);

        assert_eq!(outcome.metrics.len(), 2);
        let t001 = &outcome.metrics[0];
        assert_eq!(t001.trip_id, "T001");
        assert!((t001.duration_s.unwrap() - 601.0).abs() < 1e-9);
        assert!((t001.distance_km_est.unwrap() - 72.5 * 601.0 / 3600.0).abs() < 1e-9);
        assert_eq!(t001.record_count, Some(2));
        assert_eq!(t001.gap_count, Some(1));
    }

    #[test]
    fn rejected_rows_keep_input_order() {
        let outcome = run_batch(RAW_BATCH, &RunConfig::default()).expect("run raw batch");

        let reasons: Vec<RejectReason> = outcome
            .rejected
            .iter()
            .map(|entry| entry.reason)
            .collect();
        assert_eq!(
            reasons,
            [
                RejectReason::MissingTripId,
                RejectReason::InvalidTimestamp,
                RejectReason::AllSensorsInvalid,
            ]
        );
        let lines: Vec<usize> = outcome.rejected.iter().map(|entry| entry.row.line).collect();
        assert_eq!(lines, [5, 6, 7]);
    }

    #[test]
    fn gap_threshold_comes_from_config() {
        let config = RunConfig {
            gap_threshold_s: 601.0,
            ..RunConfig::default()
        };
        let outcome = run_batch(RAW_BATCH, &config).expect("run raw batch");

        assert_eq!(outcome.summary.gap_count, 0);
    }

    #[test]
    fn passes_aggregate_batch_through_in_trip_order() {
        let content = "\
trip_id,duration_minutes,distance_km,avg_speed,max_speed
B_TRIP,10.0,5.0,30.0,50.0
A_TRIP,20.0,12.0,36.0,80.0
";
        let outcome = run_batch(content, &RunConfig::default()).expect("run aggregate batch");

        assert_eq!(outcome.summary.schema, "trip_aggregates");
        assert!(outcome.cleaned.is_empty());
        assert_eq!(outcome.summary.trip_count, 2);
        assert_eq!(outcome.summary.gap_count, 0);

        let ids: Vec<&str> = outcome
            .metrics
            .iter()
            .map(|metrics| metrics.trip_id.as_str())
            .collect();
        assert_eq!(ids, ["A_TRIP", "B_TRIP"]);
        assert_eq!(outcome.metrics[0].duration_s, Some(1200.0));
        assert_eq!(outcome.metrics[0].record_count, None);
    }

    #[test]
    fn unreadable_schema_aborts_the_run() {
        let err = run_batch("widget,flavor\na,sweet\n", &RunConfig::default())
            .expect_err("unknown columns must fail");
        match err {
            PipelineError::Batch(BatchError::UnknownSchema { .. }) => {}
            other => panic!("expected UnknownSchema batch error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_aborts_before_parsing() {
        let config = RunConfig {
            gap_threshold_s: -5.0,
            ..RunConfig::default()
        };
        let err = run_batch(RAW_BATCH, &config).expect_err("invalid config must fail");
        match err {
            PipelineError::Config(_) => {}
            other => panic!("expected Config error, got {other:?}"),
        }
    }
}
