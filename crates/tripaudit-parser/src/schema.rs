use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::errors::BatchError;
use crate::model::{RawBatch, RawRow, SensorField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    Minutes,
    Seconds,
}

impl DurationUnit {
    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            DurationUnit::Minutes => value * 60.0,
            DurationUnit::Seconds => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalColumn {
    TripId,
    Timestamp,
    Sensor(SensorField),
    Duration(DurationUnit),
    Distance,
    AvgSpeed,
    MaxSpeed,
    MaxMotorTemp,
    MaxCellTemp,
    Energy,
}

impl CanonicalColumn {
    pub fn canonical_name(&self) -> &'static str {
        match self {
            CanonicalColumn::TripId => "trip_id",
            CanonicalColumn::Timestamp => "timestamp",
            CanonicalColumn::Sensor(field) => field.canonical_name(),
            CanonicalColumn::Duration(_) => "duration",
            CanonicalColumn::Distance => "distance_km",
            CanonicalColumn::AvgSpeed => "avg_speed_kmh",
            CanonicalColumn::MaxSpeed => "max_speed_kmh",
            CanonicalColumn::MaxMotorTemp => "max_motor_temp_c",
            CanonicalColumn::MaxCellTemp => "max_cell_temp_c",
            CanonicalColumn::Energy => "energy_consumed_kwh",
        }
    }
}

const ALIASES: &[(CanonicalColumn, &[&str])] = &[
    (
        CanonicalColumn::TripId,
        &["trip_id", "tripid", "vehicle_id", "vehicleid"],
    ),
    (
        CanonicalColumn::Timestamp,
        &["timestamp", "time", "utc_timestamp", "datetime"],
    ),
    (
        CanonicalColumn::Sensor(SensorField::Speed),
        &["speed_kmh", "speed_kmph", "speed", "vehicle_speed"],
    ),
    (
        CanonicalColumn::Sensor(SensorField::MotorTemp),
        &["motor_temp_c", "motor_temp", "motor_temperature"],
    ),
    (
        CanonicalColumn::Sensor(SensorField::CellTemp),
        &["cell_temp_c", "cell_temp", "battery_temp", "cell_temperature"],
    ),
    (
        CanonicalColumn::Sensor(SensorField::BatteryVoltage),
        &["battery_voltage_v", "battery_voltage", "pack_voltage", "voltage"],
    ),
    (
        CanonicalColumn::Sensor(SensorField::BatteryCurrent),
        &["battery_current_a", "battery_current", "pack_current", "current"],
    ),
    (
        CanonicalColumn::Sensor(SensorField::Soc),
        &["soc_pct", "soc_percent", "soc", "state_of_charge"],
    ),
    (
        CanonicalColumn::Duration(DurationUnit::Minutes),
        &["duration_minutes", "duration_min"],
    ),
    (
        CanonicalColumn::Duration(DurationUnit::Seconds),
        &["duration_s", "duration_seconds", "duration"],
    ),
    (CanonicalColumn::Distance, &["distance_km", "distance"]),
    (
        CanonicalColumn::AvgSpeed,
        &["speed_avg", "avg_speed", "average_speed"],
    ),
    (CanonicalColumn::MaxSpeed, &["speed_max", "max_speed"]),
    (
        CanonicalColumn::MaxMotorTemp,
        &["motor_temp_max", "max_motor_temp"],
    ),
    (
        CanonicalColumn::MaxCellTemp,
        &["cell_temp_max", "max_cell_temp"],
    ),
    (
        CanonicalColumn::Energy,
        &["energy_consumed_kwh", "energy_kwh"],
    ),
];

static CANONICAL_BY_ALIAS: Lazy<HashMap<&'static str, CanonicalColumn>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (canonical, aliases) in ALIASES {
        for alias in *aliases {
            map.insert(*alias, *canonical);
        }
    }
    map
});

pub fn classify_column(name: &str) -> Option<CanonicalColumn> {
    CANONICAL_BY_ALIAS.get(name).copied()
}

fn aliases_for(target: CanonicalColumn) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(canonical, _)| *canonical == target)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

// Alias order decides ties when a batch carries more than one spelling.
fn find_target(columns: &[String], target: CanonicalColumn) -> Option<usize> {
    aliases_for(target)
        .iter()
        .find_map(|alias| columns.iter().position(|column| column == alias))
}

fn normalize_header(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesColumns {
    pub trip_id: Option<usize>,
    pub timestamp: usize,
    sensors: [Option<usize>; 6],
}

impl TimeseriesColumns {
    pub fn sensor(&self, field: SensorField) -> Option<usize> {
        self.sensors[field.index()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumns {
    pub trip_id: usize,
    pub duration: Option<(usize, DurationUnit)>,
    pub distance_km: Option<usize>,
    pub avg_speed: Option<usize>,
    pub max_speed: Option<usize>,
    pub max_motor_temp: Option<usize>,
    pub max_cell_temp: Option<usize>,
    pub energy_kwh: Option<usize>,
}

impl AggregateColumns {
    fn has_aggregate_signal(&self) -> bool {
        self.duration.is_some()
            || self.distance_km.is_some()
            || self.avg_speed.is_some()
            || self.max_speed.is_some()
            || self.max_motor_temp.is_some()
            || self.max_cell_temp.is_some()
            || self.energy_kwh.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesBatch {
    pub columns: Vec<String>,
    pub layout: TimeseriesColumns,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBatch {
    pub columns: Vec<String>,
    pub layout: AggregateColumns,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryBatch {
    Timeseries(TimeseriesBatch),
    TripAggregates(AggregateBatch),
}

impl TelemetryBatch {
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryBatch::Timeseries(_) => "raw_timeseries",
            TelemetryBatch::TripAggregates(_) => "trip_aggregates",
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            TelemetryBatch::Timeseries(batch) => &batch.columns,
            TelemetryBatch::TripAggregates(batch) => &batch.columns,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            TelemetryBatch::Timeseries(batch) => batch.rows.len(),
            TelemetryBatch::TripAggregates(batch) => batch.rows.len(),
        }
    }
}

pub fn read_batch(content: &str) -> Result<RawBatch, BatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(BatchError::MissingHeader),
    };
    let columns: Vec<String> = header.iter().map(normalize_header).collect();

    let mut rows = Vec::new();
    for (idx, record) in records.enumerate() {
        let record = record?;
        let values = record.iter().map(|value| value.to_string()).collect();
        // line numbers are 1-based and include the header row
        rows.push(RawRow {
            line: idx + 2,
            values,
        });
    }

    if rows.is_empty() {
        return Err(BatchError::EmptyBatch);
    }

    Ok(RawBatch { columns, rows })
}

pub fn detect_batch(batch: RawBatch) -> Result<TelemetryBatch, BatchError> {
    let has_sensor_column = batch
        .columns
        .iter()
        .any(|name| matches!(classify_column(name), Some(CanonicalColumn::Sensor(_))));

    if has_sensor_column {
        // A sensor column without any timestamp column is not a usable batch.
        let Some(timestamp) = find_target(&batch.columns, CanonicalColumn::Timestamp) else {
            return Err(BatchError::UnknownSchema {
                columns: batch.columns,
            });
        };

        let mut sensors = [None; 6];
        for field in SensorField::ALL {
            sensors[field.index()] =
                find_target(&batch.columns, CanonicalColumn::Sensor(field));
        }
        let layout = TimeseriesColumns {
            trip_id: find_target(&batch.columns, CanonicalColumn::TripId),
            timestamp,
            sensors,
        };
        return Ok(TelemetryBatch::Timeseries(TimeseriesBatch {
            columns: batch.columns,
            layout,
            rows: batch.rows,
        }));
    }

    if let Some(trip_id) = find_target(&batch.columns, CanonicalColumn::TripId) {
        let duration = find_target(&batch.columns, CanonicalColumn::Duration(DurationUnit::Minutes))
            .map(|idx| (idx, DurationUnit::Minutes))
            .or_else(|| {
                find_target(&batch.columns, CanonicalColumn::Duration(DurationUnit::Seconds))
                    .map(|idx| (idx, DurationUnit::Seconds))
            });
        let layout = AggregateColumns {
            trip_id,
            duration,
            distance_km: find_target(&batch.columns, CanonicalColumn::Distance),
            avg_speed: find_target(&batch.columns, CanonicalColumn::AvgSpeed),
            max_speed: find_target(&batch.columns, CanonicalColumn::MaxSpeed),
            max_motor_temp: find_target(&batch.columns, CanonicalColumn::MaxMotorTemp),
            max_cell_temp: find_target(&batch.columns, CanonicalColumn::MaxCellTemp),
            energy_kwh: find_target(&batch.columns, CanonicalColumn::Energy),
        };
        if layout.has_aggregate_signal() {
            return Ok(TelemetryBatch::TripAggregates(AggregateBatch {
                columns: batch.columns,
                layout,
                rows: batch.rows,
            }));
        }
    }

    Err(BatchError::UnknownSchema {
        columns: batch.columns,
    })
}
