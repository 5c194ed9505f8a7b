//! Shared numerics for boundary solves and parameter checks.

use crate::error::ParameterError;

/// Bisection iteration cap; the bracket halves each time.
pub const MAX_BISECTION_ITERS: usize = 200;

/// Root of a monotone increasing function on `[lo, hi]`.
///
/// Requires `f(lo) <= 0 <= f(hi)`. Returns `None` if the bracket does not hold
/// or a non-finite residual is met.
pub fn bisect_increasing<F>(mut f: F, mut lo: f64, mut hi: f64) -> Option<f64>
where
    F: FnMut(f64) -> f64,
{
    let f_lo = f(lo);
    let f_hi = f(hi);
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo > 0.0 || f_hi < 0.0 {
        return None;
    }
    if f_lo == 0.0 {
        return Some(lo);
    }
    if f_hi == 0.0 {
        return Some(hi);
    }
    for _ in 0..MAX_BISECTION_ITERS {
        let mid = 0.5 * (lo + hi);
        let r = f(mid);
        if !r.is_finite() {
            return None;
        }
        if r == 0.0 {
            return Some(mid);
        }
        if r < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if (hi - lo).abs() <= 1e-14 * mid.abs().max(1e-9) {
            break;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Push a `Missing`/`Invalid` issue unless `value` is a positive finite number.
pub(crate) fn require_positive(issues: &mut Vec<ParameterError>, field: &'static str, value: f64) {
    if !value.is_finite() || value == 0.0 {
        issues.push(ParameterError::Missing { field });
    } else if value < 0.0 {
        issues.push(ParameterError::Invalid {
            field,
            reason: format!("must be positive, got {value}"),
        });
    }
}

pub(crate) fn require_finite(issues: &mut Vec<ParameterError>, field: &'static str, value: f64) {
    if !value.is_finite() {
        issues.push(ParameterError::Missing { field });
    }
}

pub(crate) fn require_non_negative(
    issues: &mut Vec<ParameterError>,
    field: &'static str,
    value: f64,
) {
    if !value.is_finite() {
        issues.push(ParameterError::Missing { field });
    } else if value < 0.0 {
        issues.push(ParameterError::Invalid {
            field,
            reason: format!("must be non-negative, got {value}"),
        });
    }
}
