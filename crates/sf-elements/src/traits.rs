//! Boundary-condition capability shared by every non-pipe element.

use crate::element::ElementKind;
use crate::error::BcResult;

/// Linear head/flow relation at a pipe end: `H = c - b * q_in`.
///
/// `q_in` is the flow leaving the pipe into the element. A fixed head is the
/// degenerate case `b = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Characteristic {
    pub c: f64,
    pub b: f64,
}

impl Characteristic {
    pub fn new(c: f64, b: f64) -> Self {
        Self { c, b }
    }

    /// A side held at a known head.
    pub fn fixed(head: f64) -> Self {
        Self { c: head, b: 0.0 }
    }

    pub fn head_for(&self, q_in: f64) -> f64 {
        self.c - self.b * q_in
    }
}

/// Solved state at one pipe end.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EndState {
    pub head: f64,
    /// Flow from the pipe into the element.
    pub q_in: f64,
}

/// Where one side of a two-sided element (valve, turbine) gets its head from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Side {
    /// The next pipe end in the characteristic list.
    Pipe,
    /// A head that does not respond to flow: a reservoir level or free discharge.
    Fixed(f64),
}

impl Side {
    pub fn is_pipe(&self) -> bool {
        matches!(self, Side::Pipe)
    }
}

/// Runtime boundary solver for one element or merged junction group.
///
/// The solver hands each boundary the characteristics of its attached pipe
/// ends, in attachment order, and expects one [`EndState`] back per end.
pub trait BoundaryCondition: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ElementKind;

    /// Seed internal state from the initial pipe-end conditions.
    fn initialize(&mut self, _ends: &[EndState]) -> BcResult<()> {
        Ok(())
    }

    /// Solve the element's equations together with the pipe characteristics
    /// for the step ending at time `t`.
    fn boundary_equation(
        &mut self,
        ends: &[Characteristic],
        t: f64,
        dt: f64,
    ) -> BcResult<Vec<EndState>>;

    /// Elevation used for the vapour-pressure check, if the element has one.
    fn elevation(&self) -> Option<f64> {
        None
    }

    /// Named scalar outputs recorded with each snapshot.
    fn observables(&self) -> Vec<(&'static str, f64)> {
        Vec::new()
    }
}

/// Head difference characteristic across a two-sided element:
/// `dH = C - B * Q` for through-flow `Q` (upstream to downstream).
pub(crate) fn through_characteristic(up: Characteristic, down: Characteristic) -> (f64, f64) {
    (up.c - down.c, up.b + down.b)
}

/// Expand pipe ends and fixed sides into one characteristic per side.
pub(crate) fn side_characteristics(
    upstream: Side,
    downstream: Side,
    ends: &[Characteristic],
) -> Option<(Characteristic, Characteristic)> {
    let mut iter = ends.iter().copied();
    let up = match upstream {
        Side::Pipe => iter.next()?,
        Side::Fixed(h) => Characteristic::fixed(h),
    };
    let down = match downstream {
        Side::Pipe => iter.next()?,
        Side::Fixed(h) => Characteristic::fixed(h),
    };
    if iter.next().is_some() {
        return None;
    }
    Some((up, down))
}

/// Pipe-end states for a through-flow `q` across a two-sided element.
pub(crate) fn side_end_states(
    upstream: Side,
    downstream: Side,
    up: Characteristic,
    down: Characteristic,
    q: f64,
) -> Vec<EndState> {
    let mut out = Vec::with_capacity(2);
    if upstream.is_pipe() {
        out.push(EndState {
            head: up.head_for(q),
            q_in: q,
        });
    }
    if downstream.is_pipe() {
        out.push(EndState {
            head: down.head_for(-q),
            q_in: -q,
        });
    }
    out
}

/// Through-flow and side heads recovered from initial pipe-end states.
pub(crate) fn side_initial_state(
    upstream: Side,
    downstream: Side,
    ends: &[EndState],
) -> Option<(f64, f64, f64)> {
    let mut iter = ends.iter();
    let mut q = None;
    let h_up = match upstream {
        Side::Pipe => {
            let e = iter.next()?;
            q = Some(e.q_in);
            e.head
        }
        Side::Fixed(h) => h,
    };
    let h_down = match downstream {
        Side::Pipe => {
            let e = iter.next()?;
            if q.is_none() {
                q = Some(-e.q_in);
            }
            e.head
        }
        Side::Fixed(h) => h,
    };
    Some((q?, h_up, h_down))
}
