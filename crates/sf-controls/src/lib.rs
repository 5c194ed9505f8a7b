//! Turbine governor control law for surgeflow.
//!
//! The governor closes the loop between turbine speed and wicket-gate opening:
//!
//! - **PID controller**: speed error with permanent droop feedback, anti-windup
//! - **Gate servo**: first-order lag (time constant Tg) with a rate limit
//! - **Load schedule**: electrical load before and after a load rejection
//!
//! Everything here is deterministic and sampled at the solver time step.

pub mod actuator;
pub mod controller;
pub mod error;
pub mod governor;

pub use actuator::{ActuatorState, FirstOrderActuator};
pub use controller::{PidController, PidControllerState};
pub use error::{ControlError, ControlResult};
pub use governor::{Governor, GovernorParams, LoadSchedule};
