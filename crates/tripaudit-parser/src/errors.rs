use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input did not contain a header row")]
    MissingHeader,

    #[error("input did not contain any data rows")]
    EmptyBatch,

    #[error("column set matches neither raw telemetry nor trip aggregates: {columns:?}")]
    UnknownSchema { columns: Vec<String> },
}
