//! Fixed-head reservoir boundary.

use crate::common::require_finite;
use crate::element::ElementKind;
use crate::error::{BcResult, BoundaryConditionError, ParameterError};
use crate::traits::{BoundaryCondition, Characteristic, EndState};
use sf_core::units::Length;

/// Reservoir held at a constant free-surface level.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservoir {
    /// Free-surface head.
    pub level: Length,
    /// Elevation of the pipe connection.
    pub invert: Length,
}

impl Reservoir {
    pub fn new(level: Length, invert: Length) -> Self {
        Self { level, invert }
    }

    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        let mut issues = Vec::new();
        require_finite(&mut issues, "level", self.level.value);
        require_finite(&mut issues, "invert", self.invert.value);
        issues
    }
}

/// Every attached pipe end sees the reservoir level.
#[derive(Debug, Clone)]
pub struct ReservoirBoundary {
    name: String,
    kind: ElementKind,
    level: f64,
    invert: f64,
    last_flow: f64,
}

impl ReservoirBoundary {
    pub fn new(name: impl Into<String>, kind: ElementKind, params: &Reservoir) -> Self {
        Self {
            name: name.into(),
            kind,
            level: params.level.value,
            invert: params.invert.value,
            last_flow: 0.0,
        }
    }
}

impl BoundaryCondition for ReservoirBoundary {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn initialize(&mut self, ends: &[EndState]) -> BcResult<()> {
        self.last_flow = ends.iter().map(|e| e.q_in).sum();
        Ok(())
    }

    fn boundary_equation(
        &mut self,
        ends: &[Characteristic],
        _t: f64,
        _dt: f64,
    ) -> BcResult<Vec<EndState>> {
        let mut out = Vec::with_capacity(ends.len());
        for ch in ends {
            if ch.b <= 0.0 {
                return Err(BoundaryConditionError::Unsolvable {
                    element: self.name.clone(),
                    reason: "pipe end has no impedance".into(),
                });
            }
            out.push(EndState {
                head: self.level,
                q_in: (ch.c - self.level) / ch.b,
            });
        }
        self.last_flow = out.iter().map(|e| e.q_in).sum();
        Ok(out)
    }

    fn elevation(&self) -> Option<f64> {
        Some(self.invert)
    }

    fn observables(&self) -> Vec<(&'static str, f64)> {
        vec![("head", self.level), ("flow", self.last_flow)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::units::m;

    #[test]
    fn reservoir_fixes_head() {
        let mut bc = ReservoirBoundary::new(
            "R1",
            ElementKind::InletReservoir,
            &Reservoir::new(m(100.0), m(90.0)),
        );
        let ends = [Characteristic::new(90.0, 10.0)];
        let out = bc.boundary_equation(&ends, 0.1, 0.1).unwrap();
        assert_eq!(out[0].head, 100.0);
        // Flow leaves the reservoir into the pipe
        assert!((out[0].q_in + 1.0).abs() < 1e-12);
        assert_eq!(bc.elevation(), Some(90.0));
    }
}
