//! sf-moc: method-of-characteristics transient solver for pipe networks.
//!
//! ```text
//! Network ──discretize──► Discretization ──MocSolver──► SimulationResult
//! ```
//!
//! [`discretize`] picks one global time step so that every pipe has an
//! integer number of reaches, adjusting wave speeds within a tolerance.
//! [`MocSolver`] then marches the network explicitly: interior nodes from the
//! characteristic invariants, pipe ends from the boundary elements.
//!
//! ```no_run
//! # fn demo(network: &sf_network::Network) -> Result<(), sf_moc::SolveError> {
//! let result = sf_moc::run(network, 10.0, None)?;
//! println!("{} snapshots at dt = {} s", result.snapshots().len(), result.dt_s());
//! # Ok(())
//! # }
//! ```

mod boundary;
pub mod cancel;
pub mod discretize;
pub mod error;
mod grid;
pub mod options;
pub mod solver;

pub use cancel::{CancellationToken, SolveProgress};
pub use discretize::{Discretization, PipeGrid, discretize, discretize_with};
pub use error::{DiscretizationError, DiscretizationResult, SolveError, SolveResult};
pub use options::{DiscretizationConfig, SolveOptions};
pub use solver::{MocSolver, SolverState, run, run_with};
