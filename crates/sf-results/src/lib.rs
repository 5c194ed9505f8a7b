//! sf-results: simulation results, run cache and series export.

pub mod export;
pub mod hash;
pub mod result;
pub mod store;
pub mod types;

pub use hash::compute_run_id;
pub use result::{ResultStore, SimulationResult};
pub use store::{RunStore, timestamp_now};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Snapshot out of order: step {step} at t={time_s} after step {last_step} at t={last_time_s}")]
    OutOfOrder {
        step: u64,
        time_s: f64,
        last_step: u64,
        last_time_s: f64,
    },

    #[error("Snapshot has {got} node values, layout expects {expected}")]
    LayoutMismatch { expected: usize, got: usize },

    #[error("Stored run {run_id} is corrupt at snapshot line {line}: {source}")]
    CorruptRun {
        run_id: String,
        line: usize,
        source: Box<ResultsError>,
    },

    #[error("No node {index} on pipe {pipe}")]
    UnknownNode { pipe: String, index: u32 },
}
