//! Rotating mass of a turbine-generator set.

use crate::error::{BcResult, BoundaryConditionError};

/// Shaft with rotational inertia and no mechanical losses.
///
/// ```text
/// J dω/dt = (P_m - P_load) / ω
/// ```
///
/// Below `omega_min` the speed in the denominator is held at `omega_min` so the
/// torque stays bounded as the machine comes to rest.
#[derive(Clone, Debug, PartialEq)]
pub struct Shaft {
    /// Moment of inertia (kg·m²).
    pub inertia: f64,
    /// Speed floor for torque conversion (rad/s).
    pub omega_min: f64,
}

impl Shaft {
    pub fn new(name: &str, inertia: f64) -> BcResult<Self> {
        if !(inertia > 0.0 && inertia.is_finite()) {
            return Err(BoundaryConditionError::NonPhysical {
                element: name.to_string(),
                what: "shaft inertia must be positive",
            });
        }
        Ok(Self {
            inertia,
            omega_min: 0.1,
        })
    }

    /// Torque delivered by `power` at speed `omega`.
    pub fn power_to_torque(&self, power: f64, omega: f64) -> f64 {
        power / omega.abs().max(self.omega_min)
    }

    /// dω/dt for a net power surplus at speed `omega`.
    pub fn angular_acceleration(&self, net_power: f64, omega: f64) -> f64 {
        self.power_to_torque(net_power, omega) / self.inertia
    }

    /// Explicit Euler step of the speed.
    pub fn advance(&self, omega: f64, net_power: f64, dt: f64) -> f64 {
        omega + dt * self.angular_acceleration(net_power, omega)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shaft_creation() {
        assert!(Shaft::new("T1", 10.0).is_ok());
        assert!(Shaft::new("T1", 0.0).is_err());
        assert!(Shaft::new("T1", f64::NAN).is_err());
    }

    #[test]
    fn power_surplus_accelerates() {
        let shaft = Shaft::new("T1", 2.0).unwrap();
        let omega = 100.0;
        // 1 kW surplus at 100 rad/s: torque 10 N·m, alpha 5 rad/s²
        assert!((shaft.angular_acceleration(1000.0, omega) - 5.0).abs() < 1e-12);
        assert!((shaft.advance(omega, 1000.0, 0.1) - 100.5).abs() < 1e-12);
    }

    #[test]
    fn torque_regularised_at_rest() {
        let shaft = Shaft::new("T1", 1.0).unwrap();
        let t = shaft.power_to_torque(1.0, 0.0);
        assert!(t.is_finite());
        assert!((t - 10.0).abs() < 1e-12);
    }
}
