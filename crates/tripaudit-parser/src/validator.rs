use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::{
    AggregateRow, RawRow, Record, RejectReason, RejectedRow, SensorField, SensorLimits,
};
use crate::schema::{AggregateColumns, TimeseriesColumns};

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(Record),
    Rejected(RejectedRow),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome {
    Standardized(AggregateRow),
    Rejected(RejectedRow),
}

enum Coerced {
    Null,
    Value(f64),
    Unparseable,
}

fn coerce_number(raw: &str) -> Coerced {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("na")
    {
        return Coerced::Null;
    }
    match trimmed.parse::<f64>() {
        Ok(value) => Coerced::Value(value),
        Err(_) => Coerced::Unparseable,
    }
}

pub fn parse_timestamp_utc(value: &str) -> Option<DateTime<Utc>> {
    static FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
    ];

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc());
        }
    }
    None
}

pub fn validate_row(layout: &TimeseriesColumns, row: &RawRow, limits: &SensorLimits) -> RowOutcome {
    let trip_id = layout
        .trip_id
        .map(|idx| row.get(idx).trim())
        .unwrap_or_default();
    if trip_id.is_empty() {
        return RowOutcome::Rejected(RejectedRow {
            row: row.clone(),
            reason: RejectReason::MissingTripId,
        });
    }

    let Some(timestamp) = parse_timestamp_utc(row.get(layout.timestamp)) else {
        return RowOutcome::Rejected(RejectedRow {
            row: row.clone(),
            reason: RejectReason::InvalidTimestamp,
        });
    };

    let mut record = Record::new(trip_id, timestamp);
    for field in SensorField::ALL {
        let Some(idx) = layout.sensor(field) else {
            continue;
        };
        let raw = row.get(idx).trim();
        match coerce_number(raw) {
            Coerced::Null => {}
            Coerced::Value(value) if limits.range(field).contains(value) => {
                *record.sensor_mut(field) = Some(value);
            }
            Coerced::Value(_) => {
                record
                    .salvage_notes
                    .push(format!("{} out of range: {raw}", field.canonical_name()));
            }
            Coerced::Unparseable => {
                record
                    .salvage_notes
                    .push(format!("{} not numeric: {raw}", field.canonical_name()));
            }
        }
    }

    if SensorField::ALL
        .iter()
        .all(|field| record.sensor(*field).is_none())
    {
        return RowOutcome::Rejected(RejectedRow {
            row: row.clone(),
            reason: RejectReason::AllSensorsInvalid,
        });
    }

    RowOutcome::Accepted(record)
}

pub fn standardize_row(layout: &AggregateColumns, row: &RawRow) -> AggregateOutcome {
    let trip_id = row.get(layout.trip_id).trim();
    if trip_id.is_empty() {
        return AggregateOutcome::Rejected(RejectedRow {
            row: row.clone(),
            reason: RejectReason::MissingTripId,
        });
    }

    let number_at = |idx: usize| match coerce_number(row.get(idx)) {
        Coerced::Value(value) => Some(value),
        Coerced::Null | Coerced::Unparseable => None,
    };

    AggregateOutcome::Standardized(AggregateRow {
        trip_id: trip_id.to_string(),
        duration_s: layout
            .duration
            .and_then(|(idx, unit)| number_at(idx).map(|value| unit.to_seconds(value))),
        distance_km: layout.distance_km.and_then(number_at),
        avg_speed_kmh: layout.avg_speed.and_then(number_at),
        max_speed_kmh: layout.max_speed.and_then(number_at),
        max_motor_temp_c: layout.max_motor_temp.and_then(number_at),
        max_cell_temp_c: layout.max_cell_temp.and_then(number_at),
        energy_kwh: layout.energy_kwh.and_then(number_at),
    })
}
