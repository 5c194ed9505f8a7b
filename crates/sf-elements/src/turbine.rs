//! Reaction turbine with speed governor.

use crate::common::{require_finite, require_positive};
use crate::element::ElementKind;
use crate::error::{BcResult, BoundaryConditionError, ParameterError, UnknownRunner};
use crate::shaft::Shaft;
use crate::traits::{
    BoundaryCondition, Characteristic, EndState, Side, side_characteristics, side_end_states,
    side_initial_state, through_characteristic,
};
use sf_controls::{Governor, GovernorParams, LoadSchedule};
use sf_core::units::constants::{G0_MPS2, WATER_DENSITY_KG_M3};
use sf_core::units::{AngularVelocity, Length, MomentOfInertia, VolumeRate};
use std::fmt;
use std::str::FromStr;

/// Runner family selected for the unit.
///
/// Every family currently shares the characteristic below; the tag is kept
/// so documents round trip the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunnerType {
    #[default]
    Francis,
    Kaplan,
    Pelton,
}

impl RunnerType {
    pub const ALL: [RunnerType; 3] = [RunnerType::Francis, RunnerType::Kaplan, RunnerType::Pelton];

    pub fn as_str(self) -> &'static str {
        match self {
            RunnerType::Francis => "Francis",
            RunnerType::Kaplan => "Kaplan",
            RunnerType::Pelton => "Pelton",
        }
    }
}

impl fmt::Display for RunnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunnerType {
    type Err = UnknownRunner;

    /// Accepts the family name, optionally followed by a model number ("Francis 23").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let family = s.split_whitespace().next().unwrap_or("");
        RunnerType::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(family))
            .ok_or_else(|| UnknownRunner(s.to_string()))
    }
}

/// Turbine rating and governor settings.
///
/// ## Model
///
/// Flow through the runner at gate opening `y`:
///
/// ```text
/// Q = y · Q_o · sign(ΔH) · sqrt(|ΔH| / H_o)
/// ```
///
/// Mechanical power uses a parabolic speed-efficiency curve peaking at rated speed:
///
/// ```text
/// P_m = η_p · max(0, 1 - (ω/ω_o - 1)²) · ρ g Q ΔH
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Turbine {
    pub rated_head: Length,
    pub rated_flow: VolumeRate,
    pub rated_diameter: Length,
    pub rated_speed: AngularVelocity,
    pub inertia: MomentOfInertia,
    /// Peak efficiency, in `(0, 1]`.
    pub efficiency: f64,
    pub elevation: Length,
    pub runner: RunnerType,
    pub governor: GovernorParams,
}

impl Turbine {
    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        let mut issues = Vec::new();
        require_positive(&mut issues, "rated_head", self.rated_head.value);
        require_positive(&mut issues, "rated_flow", self.rated_flow.value);
        require_positive(&mut issues, "rated_diameter", self.rated_diameter.value);
        require_positive(&mut issues, "rated_speed", self.rated_speed.value);
        require_positive(&mut issues, "inertia", self.inertia.value);
        require_positive(&mut issues, "efficiency", self.efficiency);
        if self.efficiency > 1.0 {
            issues.push(ParameterError::Invalid {
                field: "efficiency",
                reason: format!("must not exceed 1, got {}", self.efficiency),
            });
        }
        require_finite(&mut issues, "elevation", self.elevation.value);
        if let Err((field, reason)) = self.governor.check() {
            issues.push(ParameterError::Invalid {
                field: "governor",
                reason: format!("{field} {reason}"),
            });
        }
        issues
    }

    /// Relative efficiency at per-unit speed.
    pub fn speed_efficiency(omega_pu: f64) -> f64 {
        let dev = omega_pu - 1.0;
        (1.0 - dev * dev).max(0.0)
    }

    /// Flow at gate `y` under head difference `dh`.
    pub fn flow(&self, gate: f64, dh: f64) -> f64 {
        gate * self.rated_flow.value * dh.signum() * (dh.abs() / self.rated_head.value).sqrt()
    }
}

/// Turbine coupled to its pipes, shaft and governor.
#[derive(Debug, Clone)]
pub struct TurbineBoundary {
    name: String,
    params: Turbine,
    upstream: Side,
    downstream: Side,
    shaft: Shaft,
    governor: Governor,
    load: LoadSchedule,
    gate: f64,
    omega: f64,
    initial_load_w: f64,
    flow: f64,
    head_drop: f64,
    power_w: f64,
}

impl TurbineBoundary {
    pub fn new(
        name: impl Into<String>,
        params: &Turbine,
        upstream: Side,
        downstream: Side,
    ) -> BcResult<Self> {
        let name = name.into();
        let shaft = Shaft::new(&name, params.inertia.value)?;
        let governor = Governor::new(&params.governor, 1.0)?;
        Ok(Self {
            shaft,
            governor,
            load: params.governor.load_schedule(),
            upstream,
            downstream,
            gate: 1.0,
            omega: params.rated_speed.value,
            initial_load_w: 0.0,
            flow: 0.0,
            head_drop: 0.0,
            power_w: 0.0,
            params: params.clone(),
            name,
        })
    }

    pub fn gate(&self) -> f64 {
        self.gate
    }

    pub fn speed_rad_s(&self) -> f64 {
        self.omega
    }

    fn omega_pu(&self) -> f64 {
        self.omega / self.params.rated_speed.value
    }

    fn mechanical_power(&self, q: f64, dh: f64) -> f64 {
        self.params.efficiency
            * Turbine::speed_efficiency(self.omega_pu())
            * WATER_DENSITY_KG_M3
            * G0_MPS2
            * q
            * dh
    }

    /// Through-flow satisfying `Q|Q| = κ (C - B Q)` with `κ = (y Q_o)² / H_o`.
    fn solve_flow(&self, c: f64, b: f64) -> f64 {
        let kappa = (self.gate * self.params.rated_flow.value).powi(2) / self.params.rated_head.value;
        if kappa == 0.0 || c == 0.0 {
            return 0.0;
        }
        let kb = kappa * b;
        2.0 * kappa * c / (kb + (kb * kb + 4.0 * kappa * c.abs()).sqrt())
    }
}

impl BoundaryCondition for TurbineBoundary {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Turbine
    }

    fn initialize(&mut self, ends: &[EndState]) -> BcResult<()> {
        let (q, h_up, h_down) = side_initial_state(self.upstream, self.downstream, ends)
            .ok_or_else(|| BoundaryConditionError::Unsolvable {
                element: self.name.clone(),
                reason: "pipe ends do not match turbine sides".into(),
            })?;
        let dh = h_up - h_down;
        let full_gate_flow = self.params.flow(1.0, dh);
        self.gate = if q > 0.0 && full_gate_flow > 0.0 {
            (q / full_gate_flow).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if q > 0.0 && full_gate_flow > 0.0 && q > full_gate_flow {
            tracing::warn!(
                element = %self.name,
                flow = q,
                capacity = full_gate_flow,
                "initial flow exceeds full-gate capacity, gate clamped"
            );
        }
        self.omega = self.params.rated_speed.value;
        self.flow = q;
        self.head_drop = dh;
        self.power_w = self.mechanical_power(q, dh);
        self.initial_load_w = self.power_w;
        self.governor = Governor::new(&self.params.governor, self.gate)?;
        Ok(())
    }

    fn boundary_equation(
        &mut self,
        ends: &[Characteristic],
        t: f64,
        dt: f64,
    ) -> BcResult<Vec<EndState>> {
        let (up, down) = side_characteristics(self.upstream, self.downstream, ends)
            .ok_or_else(|| BoundaryConditionError::Unsolvable {
                element: self.name.clone(),
                reason: "pipe ends do not match turbine sides".into(),
            })?;
        let (c, b) = through_characteristic(up, down);
        let q = self.solve_flow(c, b);
        let dh = c - b * q;

        let p_m = self.mechanical_power(q, dh);
        let p_load = self.initial_load_w * self.load.load_factor(t);
        self.omega = self.shaft.advance(self.omega, p_m - p_load, dt).max(0.0);
        self.gate = self.governor.update(self.omega_pu(), self.gate, dt);

        self.flow = q;
        self.head_drop = dh;
        self.power_w = p_m;
        Ok(side_end_states(self.upstream, self.downstream, up, down, q))
    }

    fn elevation(&self) -> Option<f64> {
        Some(self.params.elevation.value)
    }

    fn observables(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("flow", self.flow),
            ("gate", self.gate),
            ("speed_rpm", self.omega * 60.0 / (2.0 * std::f64::consts::PI)),
            ("power_w", self.power_w),
            ("head_drop", self.head_drop),
        ]
    }
}
