//! Elastic pipe: parameters and method-of-characteristics coefficients.

use crate::common::{require_finite, require_non_negative, require_positive};
use crate::error::ParameterError;
use sf_core::signed_square;
use sf_core::units::constants::G0_MPS2;
use sf_core::units::{Length, Time, Velocity, VolumeRate};
use std::f64::consts::PI;

/// Pipe reach parameters.
///
/// ## Friction
///
/// Darcy–Weisbach with a friction factor derived from Manning's n:
///
/// ```text
/// f = 8 g n² / R_h^(1/3),   R_h = D / 4
/// ```
///
/// `manning_n = 0` gives a frictionless pipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipe {
    pub diameter: Length,
    pub length: Length,
    pub wave_celerity: Velocity,
    pub manning_n: f64,
    /// Minimum number of computational reaches.
    pub reaches: u32,
    /// Head at the upstream node at t = 0.
    pub initial_head: Length,
    /// Flow at t = 0, uniform along the pipe.
    pub initial_flow: VolumeRate,
    /// Optional ceiling on the global time step; zero means none.
    pub dt_max: Option<Time>,
}

impl Pipe {
    pub fn area_m2(&self) -> f64 {
        PI * self.diameter.value * self.diameter.value / 4.0
    }

    /// Wave travel time `L / a` in seconds.
    pub fn travel_time_s(&self) -> f64 {
        self.length.value / self.wave_celerity.value
    }

    /// Step ceiling in seconds, `None` when unbounded.
    pub fn dt_max_s(&self) -> Option<f64> {
        self.dt_max.map(|t| t.value).filter(|&t| t > 0.0)
    }

    pub fn friction_factor(&self) -> f64 {
        if self.manning_n == 0.0 {
            return 0.0;
        }
        let hydraulic_radius = self.diameter.value / 4.0;
        8.0 * G0_MPS2 * self.manning_n * self.manning_n / hydraulic_radius.cbrt()
    }

    /// Characteristic coefficients for a reach of length `dx` with celerity `celerity`.
    pub fn coefficients(&self, dx: f64, celerity: f64) -> PipeCoefficients {
        let area = self.area_m2();
        PipeCoefficients {
            b: celerity / (G0_MPS2 * area),
            r: self.friction_factor() * dx
                / (2.0 * G0_MPS2 * self.diameter.value * area * area),
        }
    }

    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        let mut issues = Vec::new();
        require_positive(&mut issues, "diameter", self.diameter.value);
        require_positive(&mut issues, "length", self.length.value);
        require_positive(&mut issues, "wave_celerity", self.wave_celerity.value);
        require_non_negative(&mut issues, "manning_n", self.manning_n);
        if self.reaches == 0 {
            issues.push(ParameterError::Missing { field: "reaches" });
        }
        require_finite(&mut issues, "initial_head", self.initial_head.value);
        require_finite(&mut issues, "initial_flow", self.initial_flow.value);
        if let Some(dt) = self.dt_max {
            require_non_negative(&mut issues, "dt_max", dt.value);
        }
        issues
    }
}

/// `B = a / (g A)` and `R = f Δx / (2 g D A²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeCoefficients {
    pub b: f64,
    pub r: f64,
}

impl PipeCoefficients {
    /// C+ invariant carried from node `(h, q)` toward increasing index.
    pub fn c_plus(&self, h: f64, q: f64) -> f64 {
        h + self.b * q - self.r * signed_square(q)
    }

    /// C- invariant carried from node `(h, q)` toward decreasing index.
    pub fn c_minus(&self, h: f64, q: f64) -> f64 {
        h - self.b * q + self.r * signed_square(q)
    }

    /// Interior node from the two invariants.
    pub fn interior(&self, cp: f64, cm: f64) -> (f64, f64) {
        (0.5 * (cp + cm), (cp - cm) / (2.0 * self.b))
    }

    /// Steady head drop over one reach at flow `q`.
    pub fn steady_drop(&self, q: f64) -> f64 {
        self.r * signed_square(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::units::{m, m3ps, mps, s};

    pub(crate) fn test_pipe() -> Pipe {
        Pipe {
            diameter: m(1.0),
            length: m(1000.0),
            wave_celerity: mps(1000.0),
            manning_n: 0.012,
            reaches: 4,
            initial_head: m(100.0),
            initial_flow: m3ps(1.0),
            dt_max: None,
        }
    }

    #[test]
    fn manning_friction_factor() {
        let p = test_pipe();
        // 8 * 9.80665 * 0.012^2 / 0.25^(1/3)
        let expected = 8.0 * 9.80665 * 0.000144 / 0.25f64.cbrt();
        assert!((p.friction_factor() - expected).abs() < 1e-12);
        assert!((p.friction_factor() - 0.01793).abs() < 1e-4);
    }

    #[test]
    fn frictionless_pipe() {
        let mut p = test_pipe();
        p.manning_n = 0.0;
        let c = p.coefficients(250.0, 1000.0);
        assert_eq!(c.r, 0.0);
        assert!((c.b - 1000.0 / (9.80665 * p.area_m2())).abs() < 1e-9);
    }

    #[test]
    fn steady_state_is_a_fixed_point() {
        let p = test_pipe();
        let c = p.coefficients(250.0, 1000.0);
        let q = 2.0;
        let h_a = 100.0;
        let h_p = h_a - c.steady_drop(q);
        let h_b = h_p - c.steady_drop(q);
        let (h, qq) = c.interior(c.c_plus(h_a, q), c.c_minus(h_b, q));
        assert!((h - h_p).abs() < 1e-9);
        assert!((qq - q).abs() < 1e-9);
    }

    #[test]
    fn zero_dt_max_means_unbounded() {
        let mut p = test_pipe();
        p.dt_max = Some(s(0.0));
        assert_eq!(p.dt_max_s(), None);
        p.dt_max = Some(s(0.1));
        assert_eq!(p.dt_max_s(), Some(0.1));
    }

    #[test]
    fn missing_parameters_reported() {
        let mut p = test_pipe();
        p.diameter = m(0.0);
        p.reaches = 0;
        let issues = p.parameter_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field(), "diameter");
        assert_eq!(issues[1].field(), "reaches");
    }
}
