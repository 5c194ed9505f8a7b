//! Closed set of network element variants and their parameter validation.

use crate::error::{ParameterError, UnknownKind};
use crate::manifold::Manifold;
use crate::pipe::Pipe;
use crate::reservoir::Reservoir;
use crate::surge_tank::SurgeTank;
use crate::turbine::Turbine;
use crate::valve::Valve;
use std::fmt;
use std::str::FromStr;

/// Element class tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    InletReservoir,
    OutletReservoir,
    Pipe,
    Valve,
    Manifold,
    SurgeTank,
    Turbine,
}

impl ElementKind {
    pub const ALL: [ElementKind; 7] = [
        ElementKind::InletReservoir,
        ElementKind::OutletReservoir,
        ElementKind::Pipe,
        ElementKind::Valve,
        ElementKind::Manifold,
        ElementKind::SurgeTank,
        ElementKind::Turbine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::InletReservoir => "InletReservoir",
            ElementKind::OutletReservoir => "OutletReservoir",
            ElementKind::Pipe => "Pipe",
            ElementKind::Valve => "Valve",
            ElementKind::Manifold => "Manifold",
            ElementKind::SurgeTank => "SurgeTank",
            ElementKind::Turbine => "Turbine",
        }
    }

    pub fn is_reservoir(self) -> bool {
        matches!(self, ElementKind::InletReservoir | ElementKind::OutletReservoir)
    }

    /// Valves and turbines: one inlet, optional outlet, through-flow law.
    pub fn is_two_sided(self) -> bool {
        matches!(self, ElementKind::Valve | ElementKind::Turbine)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A network element with its typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    InletReservoir(Reservoir),
    OutletReservoir(Reservoir),
    Pipe(Pipe),
    Valve(Valve),
    Manifold(Manifold),
    SurgeTank(SurgeTank),
    Turbine(Turbine),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::InletReservoir(_) => ElementKind::InletReservoir,
            Element::OutletReservoir(_) => ElementKind::OutletReservoir,
            Element::Pipe(_) => ElementKind::Pipe,
            Element::Valve(_) => ElementKind::Valve,
            Element::Manifold(_) => ElementKind::Manifold,
            Element::SurgeTank(_) => ElementKind::SurgeTank,
            Element::Turbine(_) => ElementKind::Turbine,
        }
    }

    pub fn as_pipe(&self) -> Option<&Pipe> {
        match self {
            Element::Pipe(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_reservoir(&self) -> Option<&Reservoir> {
        match self {
            Element::InletReservoir(r) | Element::OutletReservoir(r) => Some(r),
            _ => None,
        }
    }

    /// Every parameter problem, in field order.
    pub fn parameter_issues(&self) -> Vec<ParameterError> {
        match self {
            Element::InletReservoir(r) | Element::OutletReservoir(r) => r.parameter_issues(),
            Element::Pipe(p) => p.parameter_issues(),
            Element::Valve(v) => v.parameter_issues(),
            Element::Manifold(m) => m.parameter_issues(),
            Element::SurgeTank(s) => s.parameter_issues(),
            Element::Turbine(t) => t.parameter_issues(),
        }
    }

    /// First parameter problem, if any.
    pub fn validate(&self) -> Result<(), ParameterError> {
        match self.parameter_issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }
}
