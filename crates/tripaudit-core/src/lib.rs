pub mod error;
pub mod config;
pub mod trips;
pub mod deltas;
pub mod metrics;
pub mod pipeline;
pub mod outputs;
