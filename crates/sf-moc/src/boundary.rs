//! Boundary groups: one solver per non-pipe element or merged junction.

use crate::grid::{EndSide, PipeState};
use sf_core::ElementId;
use sf_elements::{
    BcResult, BoundaryCondition, Characteristic, Element, EndState, ManifoldBoundary,
    ReservoirBoundary, Side, SurgeTankBoundary, TurbineBoundary, ValveBoundary,
};
use sf_network::{Attachment, Network, Port};
use std::collections::HashMap;

/// Pipe end attached to a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PipeEnd {
    /// Index into the solver's pipe states.
    pub pipe: usize,
    pub side: EndSide,
}

pub(crate) struct BoundaryGroup {
    pub bc: Box<dyn BoundaryCondition>,
    /// In the order the boundary expects its characteristics.
    pub ends: Vec<PipeEnd>,
}

impl BoundaryGroup {
    pub fn characteristics(&self, pipes: &[PipeState]) -> Vec<Characteristic> {
        self.ends
            .iter()
            .map(|e| pipes[e.pipe].characteristic(e.side))
            .collect()
    }

    pub fn end_states(&self, pipes: &[PipeState]) -> Vec<EndState> {
        self.ends
            .iter()
            .map(|e| pipes[e.pipe].end_state(e.side))
            .collect()
    }
}

struct GroupBuilder<'a> {
    network: &'a Network,
    pipe_index: &'a HashMap<ElementId, usize>,
}

impl GroupBuilder<'_> {
    fn pipe_end(&self, a: &Attachment) -> Option<PipeEnd> {
        let pipe = *self.pipe_index.get(&a.other)?;
        let side = match a.other_port {
            Port::Inlet => EndSide::Upstream,
            Port::Outlet => EndSide::Downstream,
        };
        Some(PipeEnd { pipe, side })
    }

    fn pipe_ends(&self, id: ElementId) -> Vec<PipeEnd> {
        self.network
            .attachments(id)
            .iter()
            .filter_map(|a| self.pipe_end(a))
            .collect()
    }

    /// Side of a valve or turbine on `port`; a missing link is free discharge at `elevation`.
    fn side(&self, id: ElementId, port: Port, elevation: f64, ends: &mut Vec<PipeEnd>) -> Side {
        let Some(a) = self.network.attachments_on(id, port).into_iter().next() else {
            return Side::Fixed(elevation);
        };
        if let Some(end) = self.pipe_end(&a) {
            ends.push(end);
            return Side::Pipe;
        }
        match self
            .network
            .element(a.other)
            .and_then(|e| e.element.as_reservoir())
        {
            Some(r) => Side::Fixed(r.level.value),
            None => Side::Fixed(elevation),
        }
    }

    fn two_sided(&self, id: ElementId, elevation: f64) -> (Side, Side, Vec<PipeEnd>) {
        let mut ends = Vec::with_capacity(2);
        let up = self.side(id, Port::Inlet, elevation, &mut ends);
        let down = self.side(id, Port::Outlet, elevation, &mut ends);
        (up, down, ends)
    }
}

/// Build every boundary group in `order` and seed it from the initial pipe state.
pub(crate) fn build_groups(
    network: &Network,
    order: &[ElementId],
    pipe_index: &HashMap<ElementId, usize>,
    pipes: &[PipeState],
) -> BcResult<Vec<BoundaryGroup>> {
    let builder = GroupBuilder {
        network,
        pipe_index,
    };
    let junctions = network.junction_groups();
    let mut groups = Vec::new();

    for &id in order {
        let Some(ne) = network.element(id) else {
            continue;
        };
        let name = ne.name.as_str();
        let group = match &ne.element {
            Element::Pipe(_) => continue,
            Element::InletReservoir(r) | Element::OutletReservoir(r) => {
                let ends = builder.pipe_ends(id);
                // Linked only to valves or turbines; they see it as a fixed side
                if ends.is_empty() {
                    continue;
                }
                BoundaryGroup {
                    bc: Box::new(ReservoirBoundary::new(name, ne.kind(), r)),
                    ends,
                }
            }
            Element::Manifold(_) => {
                let Some(members) = junctions.iter().find(|g| g.first() == Some(&id)) else {
                    // Non-leading member of a merged group
                    continue;
                };
                let mut names = Vec::with_capacity(members.len());
                let mut elevation = f64::INFINITY;
                let mut ends = Vec::new();
                for &m in members {
                    if let Some(me) = network.element(m) {
                        names.push(me.name.as_str());
                        if let Element::Manifold(p) = &me.element {
                            elevation = elevation.min(p.elevation.value);
                        }
                    }
                    ends.extend(builder.pipe_ends(m));
                }
                BoundaryGroup {
                    bc: Box::new(ManifoldBoundary::new(names.join("+"), elevation)),
                    ends,
                }
            }
            Element::SurgeTank(s) => BoundaryGroup {
                bc: Box::new(SurgeTankBoundary::new(name, s)),
                ends: builder.pipe_ends(id),
            },
            Element::Valve(v) => {
                let (up, down, ends) = builder.two_sided(id, v.elevation.value);
                BoundaryGroup {
                    bc: Box::new(ValveBoundary::new(name, v, up, down)),
                    ends,
                }
            }
            Element::Turbine(t) => {
                let (up, down, ends) = builder.two_sided(id, t.elevation.value);
                BoundaryGroup {
                    bc: Box::new(TurbineBoundary::new(name, t, up, down)?),
                    ends,
                }
            }
        };
        groups.push(group);
    }

    for g in &mut groups {
        let initial = g.end_states(pipes);
        g.bc.initialize(&initial)?;
    }
    Ok(groups)
}
