use serde::Serialize;
use tripaudit_parser::{AggregateRow, Record};

use crate::deltas::DeltaRecord;

/// One output row per trip. On the raw-timeseries path every core field is
/// present; on the trip-aggregated pass-through path only the fields the
/// input carried are present, and `gap_count`/`record_count` stay empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripMetrics {
    pub trip_id: String,
    pub duration_s: Option<f64>,
    pub distance_km_est: Option<f64>,
    pub gap_count: Option<usize>,
    pub record_count: Option<usize>,
    pub max_speed_kmh: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub max_motor_temp_c: Option<f64>,
    pub max_cell_temp_c: Option<f64>,
    pub min_battery_voltage_v: Option<f64>,
    pub max_battery_current_a: Option<f64>,
    pub energy_consumed_kwh: Option<f64>,
}

/// Reduces one trip's delta-annotated records to its metrics row. Duration
/// sums the non-null deltas; distance holds each speed reading until the next
/// one (a left Riemann sum), with an unknown speed contributing zero for its
/// interval.
pub fn aggregate_trip(trip_id: &str, records: &[DeltaRecord]) -> TripMetrics {
    let mut duration_s = 0.0;
    let mut distance_km = 0.0;
    let mut gap_count = 0usize;
    let mut prev_speed: Option<f64> = None;

    for entry in records {
        if let Some(elapsed) = entry.elapsed_since_prev_s {
            duration_s += elapsed;
            if let Some(speed) = prev_speed {
                distance_km += speed * elapsed / 3600.0;
            }
        }
        if entry.gap_flag {
            gap_count += 1;
        }
        prev_speed = entry.record.speed_kmh;
    }

    TripMetrics {
        trip_id: trip_id.to_string(),
        duration_s: Some(duration_s),
        distance_km_est: Some(distance_km),
        gap_count: Some(gap_count),
        record_count: Some(records.len()),
        max_speed_kmh: max_of(records, |record| record.speed_kmh),
        avg_speed_kmh: mean_of(records, |record| record.speed_kmh),
        max_motor_temp_c: max_of(records, |record| record.motor_temp_c),
        max_cell_temp_c: max_of(records, |record| record.cell_temp_c),
        min_battery_voltage_v: min_of(records, |record| record.battery_voltage_v),
        max_battery_current_a: max_of(records, |record| record.battery_current_a),
        energy_consumed_kwh: None,
    }
}

impl From<AggregateRow> for TripMetrics {
    fn from(row: AggregateRow) -> Self {
        Self {
            trip_id: row.trip_id,
            duration_s: row.duration_s,
            distance_km_est: row.distance_km,
            gap_count: None,
            record_count: None,
            max_speed_kmh: row.max_speed_kmh,
            avg_speed_kmh: row.avg_speed_kmh,
            max_motor_temp_c: row.max_motor_temp_c,
            max_cell_temp_c: row.max_cell_temp_c,
            min_battery_voltage_v: None,
            max_battery_current_a: None,
            energy_consumed_kwh: row.energy_kwh,
        }
    }
}

fn max_of(records: &[DeltaRecord], field: impl Fn(&Record) -> Option<f64>) -> Option<f64> {
    records
        .iter()
        .filter_map(|entry| field(&entry.record))
        .reduce(f64::max)
}

fn min_of(records: &[DeltaRecord], field: impl Fn(&Record) -> Option<f64>) -> Option<f64> {
    records
        .iter()
        .filter_map(|entry| field(&entry.record))
        .reduce(f64::min)
}

fn mean_of(records: &[DeltaRecord], field: impl Fn(&Record) -> Option<f64>) -> Option<f64> {
    let mut count = 0usize;
    let mut total = 0.0;
    for entry in records {
        if let Some(value) = field(&entry.record) {
            count += 1;
            total += value;
        }
    }
    (count > 0).then(|| total / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::deltas::annotate_trip;

    fn record_at(offset_s: i64, speed: Option<f64>) -> Record {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut record = Record::new("T1", base + Duration::seconds(offset_s));
        record.speed_kmh = speed;
        record
    }

    fn close(actual: Option<f64>, expected: f64) -> bool {
        actual.is_some_and(|value| (value - expected).abs() < 1e-9)
    }

    #[test]
    fn sums_duration_and_holds_speed_over_each_interval() {
        let records = vec![
            record_at(0, Some(100.0)),
            record_at(3600, Some(50.0)),
            record_at(7200, Some(0.0)),
        ];
        let metrics = aggregate_trip("T1", &annotate_trip(records, 300.0));

        assert!(close(metrics.duration_s, 7200.0));
        assert!(close(metrics.distance_km_est, 150.0));
        assert_eq!(metrics.record_count, Some(3));
        assert_eq!(metrics.gap_count, Some(2));
        assert!(close(metrics.max_speed_kmh, 100.0));
        assert!(close(metrics.avg_speed_kmh, 50.0));
    }

    #[test]
    fn unknown_speed_contributes_zero_distance() {
        let records = vec![
            record_at(0, Some(100.0)),
            record_at(3600, None),
            record_at(7200, Some(50.0)),
        ];
        let metrics = aggregate_trip("T1", &annotate_trip(records, 7200.0));

        assert!(close(metrics.duration_s, 7200.0));
        assert!(close(metrics.distance_km_est, 100.0));
        assert!(close(metrics.avg_speed_kmh, 75.0));
        assert_eq!(metrics.gap_count, Some(0));
    }

    #[test]
    fn duplicate_timestamps_add_no_duration_or_distance() {
        let records = vec![
            record_at(0, Some(60.0)),
            record_at(0, Some(60.0)),
            record_at(3600, Some(60.0)),
        ];
        let metrics = aggregate_trip("T1", &annotate_trip(records, 7200.0));

        assert!(close(metrics.duration_s, 3600.0));
        assert!(close(metrics.distance_km_est, 60.0));
        assert_eq!(metrics.record_count, Some(3));
    }

    #[test]
    fn single_record_trip_has_zero_duration_and_distance() {
        let metrics = aggregate_trip("T1", &annotate_trip(vec![record_at(0, Some(80.0))], 300.0));

        assert!(close(metrics.duration_s, 0.0));
        assert!(close(metrics.distance_km_est, 0.0));
        assert_eq!(metrics.record_count, Some(1));
        assert_eq!(metrics.gap_count, Some(0));
        assert!(close(metrics.max_speed_kmh, 80.0));
    }

    #[test]
    fn field_extremes_skip_missing_values() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut first = Record::new("T1", base);
        first.battery_voltage_v = Some(402.0);
        first.battery_current_a = Some(-12.0);
        let mut second = Record::new("T1", base + Duration::seconds(30));
        second.battery_voltage_v = Some(398.5);

        let metrics = aggregate_trip("T1", &annotate_trip(vec![first, second], 300.0));

        assert!(close(metrics.min_battery_voltage_v, 398.5));
        assert!(close(metrics.max_battery_current_a, -12.0));
        assert_eq!(metrics.max_motor_temp_c, None);
        assert_eq!(metrics.max_speed_kmh, None);
        assert_eq!(metrics.avg_speed_kmh, None);
    }

    #[test]
    fn aggregate_rows_pass_through_unchanged() {
        let metrics = TripMetrics::from(AggregateRow {
            trip_id: "TRIP_A".to_string(),
            duration_s: Some(2550.0),
            distance_km: Some(31.2),
            avg_speed_kmh: Some(44.1),
            max_speed_kmh: Some(98.4),
            max_motor_temp_c: None,
            max_cell_temp_c: None,
            energy_kwh: Some(6.3),
        });

        assert_eq!(metrics.trip_id, "TRIP_A");
        assert!(close(metrics.duration_s, 2550.0));
        assert!(close(metrics.distance_km_est, 31.2));
        assert!(close(metrics.energy_consumed_kwh, 6.3));
        assert_eq!(metrics.gap_count, None);
        assert_eq!(metrics.record_count, None);
        assert_eq!(metrics.min_battery_voltage_v, None);
    }
}
