//! PID controller used by the speed governor.
//!
//! Includes:
//! - Anti-windup protection
//! - Output clamping
//! - Integral clamping
//! - Filtered derivative action

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral (reset) time constant in seconds. `None` disables integral action.
    pub ti: Option<f64>,
    /// Derivative time constant in seconds. Zero disables derivative action.
    pub td: f64,
    /// Derivative filter time constant (seconds). Prevents noise amplification.
    pub td_filter: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
    /// Integral windup limit (optional).
    pub integral_limit: Option<f64>,
}

impl PidController {
    /// Create a new PID controller.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain
    /// * `ti` - Integral time constant (seconds), `None` for no integral action
    /// * `td` - Derivative time constant (seconds)
    /// * `td_filter` - Derivative filter time constant (seconds)
    /// * `out_min` - Minimum output
    /// * `out_max` - Maximum output
    pub fn new(
        kp: f64,
        ti: Option<f64>,
        td: f64,
        td_filter: f64,
        out_min: f64,
        out_max: f64,
    ) -> ControlResult<Self> {
        if let Some(ti) = ti
            && ti <= 0.0
        {
            return Err(ControlError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if td < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "td must be non-negative",
            });
        }
        if td_filter <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "td_filter must be positive",
            });
        }
        if out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            ti,
            td,
            td_filter,
            out_min,
            out_max,
            integral_limit: None,
        })
    }

    /// Set integral windup limit.
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    /// Compute controller output given process variable and setpoint.
    ///
    /// Uses filtered derivative to prevent noise amplification.
    pub fn update(
        &self,
        state: &PidControllerState,
        pv: f64,
        sp: f64,
        dt: f64,
    ) -> (PidControllerState, f64) {
        // Error: e = sp - pv (positive error means PV is below setpoint)
        let error = sp - pv;

        let p_term = self.kp * error;

        // Integral term with anti-windup
        let (candidate_integral, i_term) = match self.ti {
            Some(ti) => {
                let new_integral = state.integral + error * dt;
                let clamped = if let Some(limit) = self.integral_limit {
                    new_integral.clamp(-limit, limit)
                } else {
                    new_integral
                };
                (clamped, self.kp / ti * clamped)
            }
            None => (state.integral, 0.0),
        };

        // Derivative term with filtering
        // Filter: tau * d(filt)/dt + filt = error
        // Discrete: filt[n] = alpha * filt[n-1] + (1-alpha) * error
        let alpha = self.td_filter / (self.td_filter + dt);
        let filtered_error = alpha * state.filtered_error + (1.0 - alpha) * error;
        let d_term = if self.td > 0.0 && dt > 0.0 {
            self.kp * self.td * (filtered_error - state.filtered_error) / dt
        } else {
            0.0
        };

        let output_raw = p_term + i_term + d_term;
        let output = output_raw.clamp(self.out_min, self.out_max);

        // Anti-windup: if output is saturated, don't accumulate integral
        let final_integral = if output == output_raw {
            candidate_integral
        } else {
            state.integral
        };

        let new_state = PidControllerState {
            integral: final_integral,
            filtered_error,
        };

        (new_state, output)
    }
}

/// PID controller state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PidControllerState {
    /// Integral accumulator.
    pub integral: f64,
    /// Filtered error for derivative calculation.
    pub filtered_error: f64,
}
