//! Per-pipe node arrays and the interior characteristic sweep.

use sf_core::{ElementId, ensure_finite};
use sf_elements::{Characteristic, EndState, PipeCoefficients};

/// Which end of a pipe a boundary acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndSide {
    /// Node 0.
    Upstream,
    /// Node N.
    Downstream,
}

/// Heads and flows of one pipe, double buffered.
#[derive(Debug, Clone)]
pub(crate) struct PipeState {
    pub id: ElementId,
    pub name: String,
    pub coeffs: PipeCoefficients,
    pub heads: Vec<f64>,
    pub flows: Vec<f64>,
    next_heads: Vec<f64>,
    next_flows: Vec<f64>,
}

impl PipeState {
    /// Uniform initial flow with the steady friction gradient from `h0` at node 0.
    pub fn new(
        id: ElementId,
        name: String,
        coeffs: PipeCoefficients,
        reaches: u32,
        h0: f64,
        q0: f64,
    ) -> Self {
        let nodes = reaches as usize + 1;
        let drop = coeffs.steady_drop(q0);
        let heads: Vec<f64> = (0..nodes).map(|i| h0 - i as f64 * drop).collect();
        let flows = vec![q0; nodes];
        Self {
            id,
            name,
            coeffs,
            next_heads: heads.clone(),
            next_flows: flows.clone(),
            heads,
            flows,
        }
    }

    pub fn last(&self) -> usize {
        self.heads.len() - 1
    }

    /// Interior nodes `1..N` of the next level from the current level.
    pub fn sweep_interior(&mut self) {
        let c = self.coeffs;
        for i in 1..self.last() {
            let cp = c.c_plus(self.heads[i - 1], self.flows[i - 1]);
            let cm = c.c_minus(self.heads[i + 1], self.flows[i + 1]);
            let (h, q) = c.interior(cp, cm);
            self.next_heads[i] = h;
            self.next_flows[i] = q;
        }
    }

    /// `H_0 = Cm + B Q_0`, written with `q_in = -Q_0`.
    pub fn upstream_characteristic(&self) -> Characteristic {
        Characteristic::new(self.coeffs.c_minus(self.heads[1], self.flows[1]), self.coeffs.b)
    }

    /// `H_N = Cp - B Q_N`.
    pub fn downstream_characteristic(&self) -> Characteristic {
        let n = self.last();
        Characteristic::new(
            self.coeffs.c_plus(self.heads[n - 1], self.flows[n - 1]),
            self.coeffs.b,
        )
    }

    pub fn characteristic(&self, side: EndSide) -> Characteristic {
        match side {
            EndSide::Upstream => self.upstream_characteristic(),
            EndSide::Downstream => self.downstream_characteristic(),
        }
    }

    /// Current state of one end in boundary sign convention.
    pub fn end_state(&self, side: EndSide) -> EndState {
        match side {
            EndSide::Upstream => EndState {
                head: self.heads[0],
                q_in: -self.flows[0],
            },
            EndSide::Downstream => {
                let n = self.last();
                EndState {
                    head: self.heads[n],
                    q_in: self.flows[n],
                }
            }
        }
    }

    pub fn set_end(&mut self, side: EndSide, end: EndState) {
        match side {
            EndSide::Upstream => {
                self.next_heads[0] = end.head;
                self.next_flows[0] = -end.q_in;
            }
            EndSide::Downstream => {
                let n = self.last();
                self.next_heads[n] = end.head;
                self.next_flows[n] = end.q_in;
            }
        }
    }

    /// Promote the next level to current.
    pub fn commit(&mut self) {
        std::mem::swap(&mut self.heads, &mut self.next_heads);
        std::mem::swap(&mut self.flows, &mut self.next_flows);
    }

    /// First node whose head or flow is non-finite or beyond the limits.
    pub fn first_divergent(&self, head_limit: f64, flow_limit: f64) -> Option<(usize, f64)> {
        for (i, (&h, &q)) in self.heads.iter().zip(&self.flows).enumerate() {
            if out_of_bounds(h, head_limit) {
                return Some((i, h));
            }
            if out_of_bounds(q, flow_limit) {
                return Some((i, q));
            }
        }
        None
    }
}

fn out_of_bounds(v: f64, limit: f64) -> bool {
    ensure_finite(v, "node value").map_or(true, |v| v.abs() > limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe(r: f64, h0: f64, q0: f64) -> PipeState {
        PipeState::new(
            ElementId::from_index(0),
            "P1".into(),
            PipeCoefficients { b: 100.0, r },
            4,
            h0,
            q0,
        )
    }

    #[test]
    fn initial_profile_follows_friction() {
        let p = pipe(2.0, 100.0, 1.0);
        assert_eq!(p.heads, vec![100.0, 98.0, 96.0, 94.0, 92.0]);
        assert!(p.flows.iter().all(|&q| q == 1.0));
    }

    #[test]
    fn steady_interior_is_unchanged() {
        let mut p = pipe(2.0, 100.0, 1.0);
        p.sweep_interior();
        p.set_end(EndSide::Upstream, p.end_state(EndSide::Upstream));
        p.set_end(EndSide::Downstream, p.end_state(EndSide::Downstream));
        p.commit();
        for (h, expected) in p.heads.iter().zip([100.0, 98.0, 96.0, 94.0, 92.0]) {
            assert!((h - expected).abs() < 1e-9);
        }
        assert!(p.flows.iter().all(|&q| (q - 1.0).abs() < 1e-12));
    }

    #[test]
    fn end_characteristics_reproduce_steady_heads() {
        let p = pipe(2.0, 100.0, 1.0);
        let up = p.upstream_characteristic();
        assert!((up.head_for(-1.0) - 100.0).abs() < 1e-9);
        let down = p.downstream_characteristic();
        assert!((down.head_for(1.0) - 92.0).abs() < 1e-9);
    }

    #[test]
    fn divergence_detection() {
        let mut p = pipe(0.0, 100.0, 0.0);
        assert_eq!(p.first_divergent(1e3, 1e3), None);
        p.heads[2] = f64::NAN;
        assert_eq!(p.first_divergent(1e3, 1e3).map(|(i, _)| i), Some(2));

        let mut p = pipe(0.0, 100.0, 0.0);
        p.flows[3] = -2.0e3;
        assert_eq!(p.first_divergent(1e3, 1e3), Some((3, -2.0e3)));
        p.flows[3] = f64::INFINITY;
        assert_eq!(p.first_divergent(1e3, 1e4), Some((3, f64::INFINITY)));
    }
}
