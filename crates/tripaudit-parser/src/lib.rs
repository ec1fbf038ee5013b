pub mod errors;
pub mod model;
pub mod schema;
pub mod validator;

pub use errors::BatchError;
pub use model::{
    AggregateRow, RawBatch, RawRow, Record, RejectReason, RejectedRow, SensorField, SensorLimits,
    SensorRange,
};
pub use schema::{
    classify_column, detect_batch, read_batch, AggregateBatch, AggregateColumns, CanonicalColumn,
    DurationUnit, TelemetryBatch, TimeseriesBatch, TimeseriesColumns,
};
pub use validator::{
    parse_timestamp_utc, standardize_row, validate_row, AggregateOutcome, RowOutcome,
};
