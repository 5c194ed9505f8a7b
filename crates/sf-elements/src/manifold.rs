//! Junction of several pipe ends at a common head.

use crate::common::require_finite;
use crate::element::ElementKind;
use crate::error::{BcResult, BoundaryConditionError, ParameterError};
use crate::traits::{BoundaryCondition, Characteristic, EndState};
use nalgebra::{DMatrix, DVector};
use sf_core::units::Length;

#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    pub elevation: Length,
}

impl Manifold {
    pub fn new(elevation: Length) -> Self {
        Self { elevation }
    }

    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        let mut issues = Vec::new();
        require_finite(&mut issues, "elevation", self.elevation.value);
        issues
    }
}

/// One manifold, or several manifolds linked without pipes, solved as a single node.
///
/// Unknowns `[H, q_1 .. q_k]`:
///
/// ```text
/// H + b_i q_i = c_i     (i = 1..k)
/// Σ q_i       = 0
/// ```
#[derive(Debug, Clone)]
pub struct ManifoldBoundary {
    name: String,
    elevation: f64,
    head: f64,
}

impl ManifoldBoundary {
    /// `elevation` is the lowest elevation in the merged group.
    pub fn new(name: impl Into<String>, elevation: f64) -> Self {
        Self {
            name: name.into(),
            elevation,
            head: f64::NAN,
        }
    }
}

impl BoundaryCondition for ManifoldBoundary {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ElementKind {
        ElementKind::Manifold
    }

    fn initialize(&mut self, ends: &[EndState]) -> BcResult<()> {
        if !ends.is_empty() {
            self.head = ends.iter().map(|e| e.head).sum::<f64>() / ends.len() as f64;
        }
        Ok(())
    }

    fn boundary_equation(
        &mut self,
        ends: &[Characteristic],
        _t: f64,
        _dt: f64,
    ) -> BcResult<Vec<EndState>> {
        let k = ends.len();
        if k == 0 {
            return Ok(Vec::new());
        }
        let n = k + 1;
        let mut a = DMatrix::<f64>::zeros(n, n);
        let mut rhs = DVector::<f64>::zeros(n);
        for (i, ch) in ends.iter().enumerate() {
            a[(i, 0)] = 1.0;
            a[(i, i + 1)] = ch.b;
            rhs[i] = ch.c;
        }
        for j in 1..n {
            a[(k, j)] = 1.0;
        }

        let x = a
            .lu()
            .solve(&rhs)
            .ok_or_else(|| BoundaryConditionError::Unsolvable {
                element: self.name.clone(),
                reason: "singular junction system".into(),
            })?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(BoundaryConditionError::Unsolvable {
                element: self.name.clone(),
                reason: "singular junction system".into(),
            });
        }

        self.head = x[0];
        Ok((0..k)
            .map(|i| EndState {
                head: x[0],
                q_in: x[i + 1],
            })
            .collect())
    }

    fn elevation(&self) -> Option<f64> {
        Some(self.elevation)
    }

    fn observables(&self) -> Vec<(&'static str, f64)> {
        vec![("head", self.head)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_way_junction_conserves_flow() {
        let mut bc = ManifoldBoundary::new("M1", 0.0);
        let ends = [
            Characteristic::new(100.0, 10.0),
            Characteristic::new(90.0, 20.0),
            Characteristic::new(80.0, 10.0),
        ];
        let out = bc.boundary_equation(&ends, 0.1, 0.1).unwrap();
        let sum: f64 = out.iter().map(|e| e.q_in).sum();
        assert!(sum.abs() < 1e-12);
        for (e, ch) in out.iter().zip(&ends) {
            assert!((e.head - ch.head_for(e.q_in)).abs() < 1e-9);
        }
        // H = (Σ c/b) / (Σ 1/b)
        let expected = (10.0 + 4.5 + 8.0) / (0.1 + 0.05 + 0.1);
        assert!((out[0].head - expected).abs() < 1e-9);
    }

    #[test]
    fn all_fixed_heads_are_singular() {
        let mut bc = ManifoldBoundary::new("M1", 0.0);
        let ends = [Characteristic::fixed(10.0), Characteristic::fixed(20.0)];
        let err = bc.boundary_equation(&ends, 0.1, 0.1).unwrap_err();
        assert!(matches!(err, BoundaryConditionError::Unsolvable { .. }));
    }
}
