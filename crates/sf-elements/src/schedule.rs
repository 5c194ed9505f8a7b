//! Piecewise-linear valve opening schedule.

use crate::error::ParameterError;

/// `(time_s, relative_opening)` breakpoints, times non-decreasing.
///
/// Before the first point the first opening holds, after the last point the
/// last opening holds. Repeated times give an instantaneous step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpeningSchedule {
    points: Vec<(f64, f64)>,
}

impl OpeningSchedule {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Valve held at one opening for the whole run.
    pub fn constant(opening: f64) -> Self {
        Self {
            points: vec![(0.0, opening)],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Relative opening at time `t`. An empty schedule is fully open.
    pub fn opening_at(&self, t: f64) -> f64 {
        let (Some(&(t0, y0)), Some(&(tn, yn))) = (self.points.first(), self.points.last()) else {
            return 1.0;
        };
        if t <= t0 {
            return y0;
        }
        if t >= tn {
            return yn;
        }
        // First point strictly after t; t0 < t < tn keeps idx in 1..len
        let idx = self.points.partition_point(|&(ti, _)| ti <= t);
        let (ta, ya) = self.points[idx - 1];
        let (tb, yb) = self.points[idx];
        let span = tb - ta;
        if span <= 0.0 {
            return yb;
        }
        sf_core::lerp(ya, yb, (t - ta) / span)
    }

    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        let field = "opening_schedule";
        if self.points.is_empty() {
            return vec![ParameterError::Missing { field }];
        }
        let mut issues = Vec::new();
        let mut prev_t = f64::NEG_INFINITY;
        for &(t, y) in &self.points {
            if !t.is_finite() || !y.is_finite() {
                issues.push(ParameterError::Invalid {
                    field,
                    reason: "non-finite point".into(),
                });
                break;
            }
            if t < prev_t {
                issues.push(ParameterError::Invalid {
                    field,
                    reason: format!("times must be non-decreasing ({t} after {prev_t})"),
                });
                break;
            }
            if !(0.0..=1.0).contains(&y) {
                issues.push(ParameterError::Invalid {
                    field,
                    reason: format!("opening {y} outside [0, 1]"),
                });
                break;
            }
            prev_t = t;
        }
        issues
    }
}
