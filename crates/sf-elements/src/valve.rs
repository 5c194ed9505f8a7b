//! In-line valve with a time-varying opening.

use crate::common::{bisect_increasing, require_finite, require_non_negative, require_positive};
use crate::element::ElementKind;
use crate::error::{BcResult, BoundaryConditionError, ParameterError};
use crate::schedule::OpeningSchedule;
use crate::traits::{
    BoundaryCondition, Characteristic, EndState, Side, side_characteristics, side_end_states,
    side_initial_state, through_characteristic,
};
use sf_core::units::Length;
use sf_core::units::constants::G0_MPS2;
use std::f64::consts::PI;

/// Valve parameters.
///
/// ## Loss law
///
/// ```text
/// ΔH = Kv · |v|^n / (2g) · sign(v),   v = Q / (τ A)
/// Q  = τ A · sign(ΔH) · (2g |ΔH| / Kv)^(1/n)
/// ```
///
/// with `τ` the relative opening from the schedule and `n` the loss exponent
/// (2 for a turbulent orifice).
#[derive(Debug, Clone, PartialEq)]
pub struct Valve {
    pub diameter: Length,
    pub loss_coefficient: f64,
    pub loss_exponent: f64,
    pub elevation: Length,
    pub opening_schedule: OpeningSchedule,
}

impl Valve {
    pub fn area_m2(&self) -> f64 {
        PI * self.diameter.value * self.diameter.value / 4.0
    }

    /// Flow through the valve at opening `tau` under head difference `dh`.
    pub fn flow(&self, tau: f64, dh: f64) -> f64 {
        if tau <= 0.0 || dh == 0.0 {
            return 0.0;
        }
        let magnitude =
            (2.0 * G0_MPS2 * dh.abs() / self.loss_coefficient).powf(1.0 / self.loss_exponent);
        tau * self.area_m2() * dh.signum() * magnitude
    }

    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        let mut issues = Vec::new();
        require_positive(&mut issues, "diameter", self.diameter.value);
        require_non_negative(&mut issues, "loss_coefficient", self.loss_coefficient);
        require_positive(&mut issues, "loss_exponent", self.loss_exponent);
        require_finite(&mut issues, "elevation", self.elevation.value);
        issues.extend(self.opening_schedule.parameter_issues());
        issues
    }
}

/// Valve solved jointly with the characteristic of each attached pipe.
#[derive(Debug, Clone)]
pub struct ValveBoundary {
    name: String,
    params: Valve,
    upstream: Side,
    downstream: Side,
    opening: f64,
    flow: f64,
}

impl ValveBoundary {
    pub fn new(name: impl Into<String>, params: &Valve, upstream: Side, downstream: Side) -> Self {
        Self {
            name: name.into(),
            opening: params.opening_schedule.opening_at(0.0),
            params: params.clone(),
            upstream,
            downstream,
            flow: 0.0,
        }
    }

    fn unsolvable(&self, reason: impl Into<String>) -> BoundaryConditionError {
        BoundaryConditionError::Unsolvable {
            element: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Through-flow satisfying `Q = law(C - B Q)`.
    fn solve_flow(&self, tau: f64, c: f64, b: f64) -> BcResult<f64> {
        if tau <= 0.0 || c == 0.0 {
            return Ok(0.0);
        }
        if self.params.loss_coefficient == 0.0 {
            return Err(self.unsolvable("zero loss coefficient with open valve"));
        }
        if b == 0.0 {
            return Ok(self.params.flow(tau, c));
        }
        // Root lies between zero and the flow that cancels the head difference
        let bound = c / b;
        let (lo, hi) = if bound > 0.0 { (0.0, bound) } else { (bound, 0.0) };
        bisect_increasing(|q| q - self.params.flow(tau, c - b * q), lo, hi)
            .ok_or_else(|| self.unsolvable("valve flow did not bracket"))
    }
}

impl BoundaryCondition for ValveBoundary {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Valve
    }

    fn initialize(&mut self, ends: &[EndState]) -> BcResult<()> {
        if let Some((q, _, _)) = side_initial_state(self.upstream, self.downstream, ends) {
            self.flow = q;
        }
        Ok(())
    }

    fn boundary_equation(
        &mut self,
        ends: &[Characteristic],
        t: f64,
        _dt: f64,
    ) -> BcResult<Vec<EndState>> {
        let (up, down) = side_characteristics(self.upstream, self.downstream, ends)
            .ok_or_else(|| self.unsolvable("pipe ends do not match valve sides"))?;
        let tau = self.params.opening_schedule.opening_at(t);
        let (c, b) = through_characteristic(up, down);
        let q = self.solve_flow(tau, c, b)?;
        self.opening = tau;
        self.flow = q;
        Ok(side_end_states(self.upstream, self.downstream, up, down, q))
    }

    fn elevation(&self) -> Option<f64> {
        Some(self.params.elevation.value)
    }

    fn observables(&self) -> Vec<(&'static str, f64)> {
        vec![("opening", self.opening), ("flow", self.flow)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::units::m;

    fn valve(kv: f64, schedule: OpeningSchedule) -> Valve {
        Valve {
            diameter: m(0.5),
            loss_coefficient: kv,
            loss_exponent: 2.0,
            elevation: m(0.0),
            opening_schedule: schedule,
        }
    }

    #[test]
    fn orifice_law() {
        let v = valve(1.0, OpeningSchedule::constant(1.0));
        let q = v.flow(1.0, 20.0);
        let expected = v.area_m2() * (2.0 * G0_MPS2 * 20.0).sqrt();
        assert!((q - expected).abs() < 1e-9);
        assert!((v.flow(1.0, -20.0) + expected).abs() < 1e-9);
        assert_eq!(v.flow(0.0, 20.0), 0.0);
    }

    #[test]
    fn pipe_to_reservoir_balances_heads() {
        let v = valve(4.0, OpeningSchedule::constant(0.8));
        let mut bc = ValveBoundary::new("V1", &v, Side::Pipe, Side::Fixed(80.0));
        let ends = [Characteristic::new(100.0, 50.0)];
        let out = bc.boundary_equation(&ends, 1.0, 0.1).unwrap();
        let q = out[0].q_in;
        assert!(q > 0.0);
        // Residual of the loss law at the solved point
        let dh = out[0].head - 80.0;
        assert!((v.flow(0.8, dh) - q).abs() < 1e-9);
        assert!((out[0].head - (100.0 - 50.0 * q)).abs() < 1e-9);
    }

    #[test]
    fn reverse_head_gives_reverse_flow() {
        let v = valve(2.0, OpeningSchedule::constant(1.0));
        let mut bc = ValveBoundary::new("V1", &v, Side::Pipe, Side::Pipe);
        let ends = [Characteristic::new(50.0, 30.0), Characteristic::new(70.0, 30.0)];
        let out = bc.boundary_equation(&ends, 0.0, 0.1).unwrap();
        assert!(out[0].q_in < 0.0);
        assert_eq!(out[0].q_in, -out[1].q_in);
    }

    #[test]
    fn closed_valve_stops_flow() {
        let v = valve(2.0, OpeningSchedule::new(vec![(0.0, 1.0), (0.0, 0.0)]));
        let mut bc = ValveBoundary::new("V1", &v, Side::Pipe, Side::Fixed(0.0));
        let ends = [Characteristic::new(150.0, 20.0)];
        let out = bc.boundary_equation(&ends, 0.1, 0.1).unwrap();
        assert_eq!(out[0].q_in, 0.0);
        assert_eq!(out[0].head, 150.0);
        assert_eq!(bc.observables()[0], ("opening", 0.0));
    }

    #[test]
    fn zero_loss_coefficient_is_unsolvable() {
        let v = valve(0.0, OpeningSchedule::constant(1.0));
        let mut bc = ValveBoundary::new("V1", &v, Side::Pipe, Side::Fixed(0.0));
        let err = bc
            .boundary_equation(&[Characteristic::new(10.0, 1.0)], 0.1, 0.1)
            .unwrap_err();
        assert!(matches!(err, BoundaryConditionError::Unsolvable { .. }));
    }
}
