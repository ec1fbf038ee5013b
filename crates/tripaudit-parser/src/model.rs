use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorField {
    Speed,
    MotorTemp,
    CellTemp,
    BatteryVoltage,
    BatteryCurrent,
    Soc,
}

impl SensorField {
    pub const ALL: [SensorField; 6] = [
        SensorField::Speed,
        SensorField::MotorTemp,
        SensorField::CellTemp,
        SensorField::BatteryVoltage,
        SensorField::BatteryCurrent,
        SensorField::Soc,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            SensorField::Speed => "speed_kmh",
            SensorField::MotorTemp => "motor_temp_c",
            SensorField::CellTemp => "cell_temp_c",
            SensorField::BatteryVoltage => "battery_voltage_v",
            SensorField::BatteryCurrent => "battery_current_a",
            SensorField::Soc => "soc_pct",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorField::Speed => "km/h",
            SensorField::MotorTemp => "degC",
            SensorField::CellTemp => "degC",
            SensorField::BatteryVoltage => "V",
            SensorField::BatteryCurrent => "A",
            SensorField::Soc => "%",
        }
    }

    pub fn default_range(&self) -> SensorRange {
        match self {
            SensorField::Speed => SensorRange::new(0.0, 250.0),
            SensorField::MotorTemp => SensorRange::new(-40.0, 200.0),
            SensorField::CellTemp => SensorRange::new(-40.0, 100.0),
            SensorField::BatteryVoltage => SensorRange::new(200.0, 1000.0),
            SensorField::BatteryCurrent => SensorRange::new(-500.0, 500.0),
            SensorField::Soc => SensorRange::new(0.0, 100.0),
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            SensorField::Speed => 0,
            SensorField::MotorTemp => 1,
            SensorField::CellTemp => 2,
            SensorField::BatteryVoltage => 3,
            SensorField::BatteryCurrent => 4,
            SensorField::Soc => 5,
        }
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRange {
    pub min: f64,
    pub max: f64,
}

impl SensorRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorLimits {
    pub speed_kmh: SensorRange,
    pub motor_temp_c: SensorRange,
    pub cell_temp_c: SensorRange,
    pub battery_voltage_v: SensorRange,
    pub battery_current_a: SensorRange,
    pub soc_pct: SensorRange,
}

impl Default for SensorLimits {
    fn default() -> Self {
        Self {
            speed_kmh: SensorField::Speed.default_range(),
            motor_temp_c: SensorField::MotorTemp.default_range(),
            cell_temp_c: SensorField::CellTemp.default_range(),
            battery_voltage_v: SensorField::BatteryVoltage.default_range(),
            battery_current_a: SensorField::BatteryCurrent.default_range(),
            soc_pct: SensorField::Soc.default_range(),
        }
    }
}

impl SensorLimits {
    pub fn range(&self, field: SensorField) -> SensorRange {
        match field {
            SensorField::Speed => self.speed_kmh,
            SensorField::MotorTemp => self.motor_temp_c,
            SensorField::CellTemp => self.cell_temp_c,
            SensorField::BatteryVoltage => self.battery_voltage_v,
            SensorField::BatteryCurrent => self.battery_current_a,
            SensorField::Soc => self.soc_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub values: Vec<String>,
}

impl RawRow {
    pub fn get(&self, idx: usize) -> &str {
        self.values.get(idx).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub trip_id: String,
    pub timestamp: DateTime<Utc>,
    pub speed_kmh: Option<f64>,
    pub motor_temp_c: Option<f64>,
    pub cell_temp_c: Option<f64>,
    pub battery_voltage_v: Option<f64>,
    pub battery_current_a: Option<f64>,
    pub soc_pct: Option<f64>,
    pub salvage_notes: Vec<String>,
}

impl Record {
    pub fn new(trip_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            trip_id: trip_id.into(),
            timestamp,
            speed_kmh: None,
            motor_temp_c: None,
            cell_temp_c: None,
            battery_voltage_v: None,
            battery_current_a: None,
            soc_pct: None,
            salvage_notes: Vec::new(),
        }
    }

    pub fn sensor(&self, field: SensorField) -> Option<f64> {
        match field {
            SensorField::Speed => self.speed_kmh,
            SensorField::MotorTemp => self.motor_temp_c,
            SensorField::CellTemp => self.cell_temp_c,
            SensorField::BatteryVoltage => self.battery_voltage_v,
            SensorField::BatteryCurrent => self.battery_current_a,
            SensorField::Soc => self.soc_pct,
        }
    }

    pub fn sensor_mut(&mut self, field: SensorField) -> &mut Option<f64> {
        match field {
            SensorField::Speed => &mut self.speed_kmh,
            SensorField::MotorTemp => &mut self.motor_temp_c,
            SensorField::CellTemp => &mut self.cell_temp_c,
            SensorField::BatteryVoltage => &mut self.battery_voltage_v,
            SensorField::BatteryCurrent => &mut self.battery_current_a,
            SensorField::Soc => &mut self.soc_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    MissingTripId,
    InvalidTimestamp,
    AllSensorsInvalid,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingTripId => "missing_trip_id",
            RejectReason::InvalidTimestamp => "invalid_timestamp",
            RejectReason::AllSensorsInvalid => "all_sensors_invalid",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: RawRow,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub trip_id: String,
    pub duration_s: Option<f64>,
    pub distance_km: Option<f64>,
    pub avg_speed_kmh: Option<f64>,
    pub max_speed_kmh: Option<f64>,
    pub max_motor_temp_c: Option<f64>,
    pub max_cell_temp_c: Option<f64>,
    pub energy_kwh: Option<f64>,
}
