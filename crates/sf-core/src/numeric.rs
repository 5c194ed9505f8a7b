use crate::{SfError, SfResult};

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> SfResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SfError::NonFinite { what, value: v })
    }
}

/// `x * |x|`, the signed square used by every quadratic loss term.
#[inline]
pub fn signed_square(x: Real) -> Real {
    x * x.abs()
}

/// Linear interpolation between `a` and `b` at fraction `s` in [0, 1].
#[inline]
pub fn lerp(a: Real, b: Real, s: Real) -> Real {
    a + (b - a) * s
}
