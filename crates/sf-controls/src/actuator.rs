//! Wicket-gate servomotor.
//!
//! The servo turns the governor's gate command into an actual gate opening in
//! `[0, 1]`. With a positive time constant it behaves as a first-order lag;
//! with a zero time constant it tracks the command directly. In both cases the
//! opening speed is capped by `rate_limit`.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Gate opening held by the servo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Current gate opening in `[0, 1]`.
    pub position: f64,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self { position: 1.0 }
    }
}

/// First-order gate servo with rate limiting.
///
/// Dynamics: `dy/dt = (cmd - y) / tau`, clamped to `[-rate_limit, rate_limit]`.
/// `tau == 0` selects the ideal servo, which moves straight toward the
/// command subject only to the rate limit.
///
/// # Example
///
/// ```
/// use sf_controls::{ActuatorState, FirstOrderActuator};
///
/// let servo = FirstOrderActuator::new(0.5, 0.2).unwrap();
/// let mut state = ActuatorState { position: 1.0 };
/// for _ in 0..10 {
///     state = servo.step(&state, 0.1, 0.0);
/// }
/// // 1 s at 0.2/s closes at most 0.2 of the stroke
/// assert!(state.position >= 0.8 - 1e-12);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderActuator {
    /// Servo time constant in seconds; zero means ideal.
    pub tau: f64,
    /// Maximum stroke speed in 1/s.
    pub rate_limit: f64,
}

impl FirstOrderActuator {
    /// Create a gate servo.
    ///
    /// # Errors
    ///
    /// Returns an error if `tau` is negative or `rate_limit` is not positive.
    pub fn new(tau: f64, rate_limit: f64) -> ControlResult<Self> {
        if !(tau >= 0.0) {
            return Err(ControlError::InvalidArg {
                what: "tau must be non-negative",
            });
        }
        if !(rate_limit > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "rate_limit must be positive",
            });
        }
        Ok(Self { tau, rate_limit })
    }

    /// True when the servo has no lag.
    pub fn is_ideal(&self) -> bool {
        self.tau == 0.0
    }

    /// Gate speed for a lagged servo, clamped to the rate limit.
    pub fn dpdt(&self, position: f64, command: f64) -> f64 {
        if self.is_ideal() {
            return 0.0;
        }
        ((command - position) / self.tau).clamp(-self.rate_limit, self.rate_limit)
    }

    /// Advance the servo by `dt` toward `command`.
    ///
    /// The returned opening is always in `[0, 1]`.
    pub fn step(&self, state: &ActuatorState, dt: f64, command: f64) -> ActuatorState {
        let max_move = self.rate_limit * dt;
        let delta = if self.is_ideal() {
            command - state.position
        } else {
            // Semi-implicit lag keeps large dt/tau from overshooting
            let alpha = dt / (self.tau + dt);
            alpha * (command - state.position)
        };
        let position = (state.position + delta.clamp(-max_move, max_move)).clamp(0.0, 1.0);
        ActuatorState { position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lagged_servo_moves_toward_command() {
        let servo = FirstOrderActuator::new(0.1, 10.0).unwrap();
        let state = servo.step(&ActuatorState { position: 0.0 }, 0.01, 1.0);
        assert!(state.position > 0.0 && state.position < 1.0);
    }

    #[test]
    fn ideal_servo_respects_rate_limit() {
        let servo = FirstOrderActuator::new(0.0, 0.2).unwrap();
        let state = servo.step(&ActuatorState { position: 1.0 }, 0.5, 0.0);
        assert!((state.position - 0.9).abs() < 1e-12);
    }

    #[test]
    fn ideal_servo_reaches_nearby_command() {
        let servo = FirstOrderActuator::new(0.0, 1.0).unwrap();
        let state = servo.step(&ActuatorState { position: 0.5 }, 0.1, 0.55);
        assert!((state.position - 0.55).abs() < 1e-12);
    }

    #[test]
    fn rate_limited_derivative() {
        let servo = FirstOrderActuator::new(1.0, 0.5).unwrap();
        assert!((servo.dpdt(0.0, 1.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn position_clamped() {
        let servo = FirstOrderActuator::new(0.0, 100.0).unwrap();
        let up = servo.step(&ActuatorState { position: 0.5 }, 0.1, 2.0);
        assert_eq!(up.position, 1.0);
        let down = servo.step(&ActuatorState { position: 0.5 }, 0.1, -1.0);
        assert_eq!(down.position, 0.0);
    }

    #[test]
    fn invalid_parameters() {
        assert!(FirstOrderActuator::new(-0.1, 1.0).is_err());
        assert!(FirstOrderActuator::new(0.1, 0.0).is_err());
        assert!(FirstOrderActuator::new(f64::NAN, 1.0).is_err());
    }
}
