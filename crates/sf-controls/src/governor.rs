//! Speed governor and load-rejection schedule for a hydro turbine.

use crate::actuator::{ActuatorState, FirstOrderActuator};
use crate::controller::{PidController, PidControllerState};
use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

fn default_kp() -> f64 {
    1.0
}

fn default_gate_rate_limit() -> f64 {
    0.2
}

/// Governor and load-rejection settings attached to a turbine.
///
/// Times are in seconds. `bp` is the permanent speed droop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorParams {
    /// Change of electrical load at rejection, as a fraction of the initial load.
    /// `-1.0` is a full rejection.
    pub load_rejection_fraction: f64,
    pub rejection_time_s: f64,
    pub ramp_time_s: f64,
    /// Gate servo time constant; zero means ideal.
    pub tg_s: f64,
    pub td_s: f64,
    /// Reset time; zero disables integral action.
    pub tr_s: f64,
    pub bp: f64,
    #[serde(default = "default_kp")]
    pub kp: f64,
    /// Maximum gate stroke speed, 1/s.
    #[serde(default = "default_gate_rate_limit")]
    pub gate_rate_limit: f64,
}

impl Default for GovernorParams {
    fn default() -> Self {
        Self {
            load_rejection_fraction: 0.0,
            rejection_time_s: 0.0,
            ramp_time_s: 0.0,
            tg_s: 0.0,
            td_s: 0.0,
            tr_s: 0.0,
            bp: 0.0,
            kp: default_kp(),
            gate_rate_limit: default_gate_rate_limit(),
        }
    }
}

impl GovernorParams {
    /// Check every field, returning the name of the first offending one.
    pub fn check(&self) -> Result<(), (&'static str, &'static str)> {
        let finite = [
            ("load_rejection_fraction", self.load_rejection_fraction),
            ("rejection_time", self.rejection_time_s),
            ("ramp_time", self.ramp_time_s),
            ("tg", self.tg_s),
            ("td", self.td_s),
            ("tr", self.tr_s),
            ("bp", self.bp),
            ("kp", self.kp),
            ("gate_rate_limit", self.gate_rate_limit),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err((name, "must be finite"));
            }
        }
        for (name, value) in [
            ("rejection_time", self.rejection_time_s),
            ("ramp_time", self.ramp_time_s),
            ("tg", self.tg_s),
            ("td", self.td_s),
            ("tr", self.tr_s),
            ("bp", self.bp),
        ] {
            if value < 0.0 {
                return Err((name, "must be non-negative"));
            }
        }
        if self.gate_rate_limit <= 0.0 {
            return Err(("gate_rate_limit", "must be positive"));
        }
        if self.load_rejection_fraction < -1.0 {
            return Err(("load_rejection_fraction", "cannot remove more than the full load"));
        }
        Ok(())
    }

    pub fn load_schedule(&self) -> LoadSchedule {
        LoadSchedule {
            fraction: self.load_rejection_fraction,
            rejection_time: self.rejection_time_s,
            ramp_time: self.ramp_time_s,
        }
    }
}

/// Electrical load relative to the initial load, as a function of time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSchedule {
    pub fraction: f64,
    pub rejection_time: f64,
    pub ramp_time: f64,
}

impl LoadSchedule {
    /// Load factor `P(t) / P_0`.
    ///
    /// `1` before the rejection, `1 + fraction` once the ramp has finished.
    pub fn load_factor(&self, t: f64) -> f64 {
        if t < self.rejection_time {
            return 1.0;
        }
        if self.ramp_time <= 0.0 {
            return 1.0 + self.fraction;
        }
        let s = ((t - self.rejection_time) / self.ramp_time).clamp(0.0, 1.0);
        1.0 + self.fraction * s
    }
}

/// Closed-loop speed governor: droop-compensated PID feeding a gate servo.
#[derive(Debug, Clone)]
pub struct Governor {
    pid: PidController,
    servo: FirstOrderActuator,
    state: PidControllerState,
    bp: f64,
    gate_ref: f64,
}

impl Governor {
    /// Build a governor trimmed around the initial gate opening.
    pub fn new(params: &GovernorParams, initial_gate: f64) -> ControlResult<Self> {
        if !(0.0..=1.0).contains(&initial_gate) {
            return Err(ControlError::InvalidArg {
                what: "initial gate must lie in [0, 1]",
            });
        }
        let ti = (params.tr_s > 0.0).then_some(params.tr_s);
        // Output is a correction to the initial gate, so the gate stays in [0, 1]
        let pid = PidController::new(
            params.kp,
            ti,
            params.td_s,
            0.05,
            -initial_gate,
            1.0 - initial_gate,
        )?;
        let servo = FirstOrderActuator::new(params.tg_s, params.gate_rate_limit)?;
        Ok(Self {
            pid,
            servo,
            state: PidControllerState::default(),
            bp: params.bp,
            gate_ref: initial_gate,
        })
    }

    pub fn initial_gate(&self) -> f64 {
        self.gate_ref
    }

    /// Advance one step and return the new gate opening.
    ///
    /// `omega_pu` is the shaft speed over rated speed, `gate` the current opening.
    pub fn update(&mut self, omega_pu: f64, gate: f64, dt: f64) -> f64 {
        // e = -(omega_pu - 1) - bp (y - y0), written as setpoint minus measurement
        let measurement = omega_pu + self.bp * (gate - self.gate_ref);
        let (state, correction) = self.pid.update(&self.state, measurement, 1.0, dt);
        self.state = state;
        let command = self.gate_ref + correction;
        self.servo
            .step(&ActuatorState { position: gate }, dt, command)
            .position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GovernorParams {
        GovernorParams {
            load_rejection_fraction: -1.0,
            rejection_time_s: 1.0,
            ramp_time_s: 2.0,
            tg_s: 0.2,
            td_s: 0.0,
            tr_s: 5.0,
            bp: 0.05,
            ..GovernorParams::default()
        }
    }

    #[test]
    fn load_factor_ramps_between_levels() {
        let sched = params().load_schedule();
        assert_eq!(sched.load_factor(0.5), 1.0);
        assert!((sched.load_factor(2.0) - 0.5).abs() < 1e-12);
        assert!(sched.load_factor(10.0).abs() < 1e-12);
    }

    #[test]
    fn zero_ramp_is_a_step() {
        let sched = LoadSchedule {
            fraction: -0.5,
            rejection_time: 1.0,
            ramp_time: 0.0,
        };
        assert_eq!(sched.load_factor(0.999), 1.0);
        assert_eq!(sched.load_factor(1.0), 0.5);
    }

    #[test]
    fn rated_speed_holds_gate() {
        let mut gov = Governor::new(&params(), 0.7).unwrap();
        let mut gate = 0.7;
        for _ in 0..100 {
            gate = gov.update(1.0, gate, 0.01);
        }
        assert!((gate - 0.7).abs() < 1e-12);
    }

    #[test]
    fn overspeed_closes_gate() {
        let mut gov = Governor::new(&params(), 0.7).unwrap();
        let mut gate = 0.7;
        for _ in 0..100 {
            gate = gov.update(1.1, gate, 0.01);
        }
        assert!(gate < 0.7);
        assert!(gate >= 0.0);
    }

    #[test]
    fn gate_speed_bounded_by_rate_limit() {
        let mut p = params();
        p.tg_s = 0.0;
        p.kp = 100.0;
        let mut gov = Governor::new(&p, 1.0).unwrap();
        let gate = gov.update(2.0, 1.0, 0.1);
        assert!((gate - (1.0 - 0.2 * 0.1)).abs() < 1e-12);
    }

    #[test]
    fn defaults_from_serde() {
        let json = r#"{"load_rejection_fraction":-1.0,"rejection_time_s":0.0,
            "ramp_time_s":0.0,"tg_s":0.0,"td_s":0.0,"tr_s":0.0,"bp":0.0}"#;
        let p: GovernorParams = serde_json::from_str(json).unwrap();
        assert_eq!(p.kp, 1.0);
        assert_eq!(p.gate_rate_limit, 0.2);
    }

    #[test]
    fn check_rejects_bad_fields() {
        let mut p = params();
        p.gate_rate_limit = 0.0;
        assert_eq!(p.check().unwrap_err().0, "gate_rate_limit");
        let mut p = params();
        p.tr_s = -1.0;
        assert_eq!(p.check().unwrap_err().0, "tr");
        assert!(params().check().is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn load_factor_bounded(
            fraction in -1.0f64..1.0,
            rejection_time in 0.0f64..10.0,
            ramp_time in 0.0f64..10.0,
            t in 0.0f64..30.0,
        ) {
            let sched = LoadSchedule { fraction, rejection_time, ramp_time };
            let f = sched.load_factor(t);
            let lo = 1.0f64.min(1.0 + fraction);
            let hi = 1.0f64.max(1.0 + fraction);
            prop_assert!(f >= lo - 1e-12 && f <= hi + 1e-12);
        }
    }
}
