//! sf-elements: element library for hydraulic transient networks.
//!
//! Provides typed parameters for every element class and the boundary
//! solvers that close the method-of-characteristics equations at pipe ends:
//! - Reservoirs (fixed head)
//! - Valves with a scheduled opening
//! - Manifold junctions, including merged groups
//! - Throttled surge tanks
//! - Governed turbines
//!
//! Each boundary implements [`BoundaryCondition`]: given the characteristic
//! `H = c - b·q_in` of every attached pipe end it returns the head and flow at
//! those ends for the new time level.

pub mod common;
pub mod element;
pub mod error;
pub mod manifold;
pub mod pipe;
pub mod reservoir;
pub mod schedule;
pub mod shaft;
pub mod surge_tank;
pub mod traits;
pub mod turbine;
pub mod valve;

pub use element::{Element, ElementKind};
pub use error::{BcResult, BoundaryConditionError, ParameterError, UnknownKind, UnknownRunner};
pub use manifold::{Manifold, ManifoldBoundary};
pub use pipe::{Pipe, PipeCoefficients};
pub use reservoir::{Reservoir, ReservoirBoundary};
pub use schedule::OpeningSchedule;
pub use shaft::Shaft;
pub use sf_controls::GovernorParams;
pub use surge_tank::{SurgeTank, SurgeTankBoundary};
pub use traits::{BoundaryCondition, Characteristic, EndState, Side};
pub use turbine::{RunnerType, Turbine, TurbineBoundary};
pub use valve::{Valve, ValveBoundary};
