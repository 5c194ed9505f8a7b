//! Error types for discretization and time stepping.

use sf_elements::BoundaryConditionError;
use sf_network::ValidationError;
use sf_results::{ResultsError, SimulationResult};
use thiserror::Error;

/// Errors from choosing the global time step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscretizationError {
    #[error(
        "No feasible time step: ceiling {dt_cap} s, celerity tolerance {tolerance}, closest misfit in pipe '{worst_pipe}'"
    )]
    NoFeasibleTimestep {
        dt_cap: f64,
        tolerance: f64,
        worst_pipe: String,
    },

    #[error("Invalid discretization config: {what}")]
    InvalidConfig { what: String },

    #[error("Network validation failed: {0}")]
    Validation(#[from] ValidationError),
}

pub type DiscretizationResult<T> = Result<T, DiscretizationError>;

/// Errors from a transient run.
///
/// Variants that abort a run in progress carry the result recorded up to the
/// last good step.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Network validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Discretization failed: {0}")]
    Discretization(#[from] DiscretizationError),

    #[error("Boundary failure at step {step} (t = {time_s} s): {source}")]
    Boundary {
        step: u64,
        time_s: f64,
        source: BoundaryConditionError,
        partial: Box<SimulationResult>,
    },

    #[error("Numeric divergence in pipe '{pipe}' node {node} at step {step} (t = {time_s} s): value {value}")]
    NumericDivergence {
        pipe: String,
        node: u32,
        step: u64,
        time_s: f64,
        value: f64,
        partial: Box<SimulationResult>,
    },

    #[error("Run cancelled after step {step}")]
    Cancelled {
        step: u64,
        partial: Box<SimulationResult>,
    },

    #[error("Result recording failed: {0}")]
    Results(#[from] ResultsError),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Invalid solver state: {what}")]
    InvalidState { what: String },
}

pub type SolveResult<T> = Result<T, SolveError>;

impl SolveError {
    /// Result recorded before the run stopped, if the run had started.
    pub fn partial(&self) -> Option<&SimulationResult> {
        match self {
            SolveError::Boundary { partial, .. }
            | SolveError::NumericDivergence { partial, .. }
            | SolveError::Cancelled { partial, .. } => Some(partial),
            _ => None,
        }
    }

    pub fn into_partial(self) -> Option<SimulationResult> {
        match self {
            SolveError::Boundary { partial, .. }
            | SolveError::NumericDivergence { partial, .. }
            | SolveError::Cancelled { partial, .. } => Some(*partial),
            _ => None,
        }
    }
}
