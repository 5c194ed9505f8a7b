//! Network validation rules.

use petgraph::unionfind::UnionFind;
use sf_elements::{ElementKind, ParameterError};
use std::collections::HashSet;

use crate::error::{ValidationError, ValidationResult};
use crate::network::{Network, Port};

impl Network {
    /// Check the network, returning the first problem found.
    pub fn validate(&self) -> ValidationResult<()> {
        match self.validation_report().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every problem in the network, in a stable order.
    pub fn validation_report(&self) -> Vec<ValidationError> {
        if self.elements.is_empty() {
            return vec![ValidationError::EmptyNetwork];
        }
        let mut report = Vec::new();
        check_names(self, &mut report);
        check_parameters(self, &mut report);
        let references_ok = check_references(self, &mut report);
        if references_ok {
            check_ports(self, &mut report);
            check_links(self, &mut report);
            check_manifold_loops(self, &mut report);
        }
        report
    }
}

fn check_names(net: &Network, report: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for e in &net.elements {
        if !seen.insert(e.name.as_str()) && reported.insert(e.name.as_str()) {
            report.push(ValidationError::DuplicateName {
                name: e.name.clone(),
            });
        }
    }
}

fn check_parameters(net: &Network, report: &mut Vec<ValidationError>) {
    for e in &net.elements {
        for issue in e.element.parameter_issues() {
            report.push(match issue {
                ParameterError::Missing { field } => ValidationError::MissingParameter {
                    element: e.name.clone(),
                    field: field.to_string(),
                },
                ParameterError::Invalid { field, reason } => ValidationError::InvalidParameter {
                    element: e.name.clone(),
                    field: field.to_string(),
                    reason,
                },
            });
        }
    }
}

/// Returns false when a connection points outside the element table.
fn check_references(net: &Network, report: &mut Vec<ValidationError>) -> bool {
    let mut ok = true;
    for c in &net.connections {
        for id in [c.from, c.to] {
            if net.element(id).is_none() {
                report.push(ValidationError::UnknownElement {
                    name: format!("#{id}"),
                });
                ok = false;
            }
        }
        if c.from == c.to {
            report.push(ValidationError::InvalidConnection {
                from: net.name_of(c.from),
                to: net.name_of(c.to),
                reason: "element connected to itself".into(),
            });
        }
    }
    ok
}

fn count_check(
    report: &mut Vec<ValidationError>,
    element: &str,
    port: Port,
    count: usize,
    required: bool,
) {
    if count == 0 && required {
        report.push(ValidationError::DanglingPort {
            element: element.to_string(),
            port: Some(port),
        });
    } else if count > 1 {
        report.push(ValidationError::PortOverloaded {
            element: element.to_string(),
            port,
            count,
        });
    }
}

fn check_ports(net: &Network, report: &mut Vec<ValidationError>) {
    for e in &net.elements {
        let inlets = net.attachments_on(e.id, Port::Inlet).len();
        let outlets = net.attachments_on(e.id, Port::Outlet).len();
        match e.kind() {
            ElementKind::Pipe => {
                count_check(report, &e.name, Port::Inlet, inlets, true);
                count_check(report, &e.name, Port::Outlet, outlets, true);
            }
            ElementKind::InletReservoir | ElementKind::OutletReservoir => {
                let working = if e.kind() == ElementKind::InletReservoir {
                    Port::Outlet
                } else {
                    Port::Inlet
                };
                for a in net.attachments_on(e.id, working.opposite()) {
                    report.push(ValidationError::InvalidConnection {
                        from: e.name.clone(),
                        to: net.name_of(a.other),
                        reason: format!("{} has no {} port", e.kind(), working.opposite()),
                    });
                }
                let count = if working == Port::Inlet { inlets } else { outlets };
                count_check(report, &e.name, working, count, true);
            }
            ElementKind::Valve | ElementKind::Turbine => {
                count_check(report, &e.name, Port::Inlet, inlets, true);
                count_check(report, &e.name, Port::Outlet, outlets, false);
                let touches_pipe = net.attachments(e.id).iter().any(|a| net.is_pipe(a.other));
                if inlets > 0 && !touches_pipe {
                    report.push(ValidationError::InvalidConnection {
                        from: e.name.clone(),
                        to: net
                            .attachments(e.id)
                            .first()
                            .map_or_else(String::new, |a| net.name_of(a.other)),
                        reason: format!("{} must be attached to at least one pipe", e.kind()),
                    });
                }
            }
            ElementKind::Manifold => {
                if inlets + outlets < 2 {
                    report.push(ValidationError::DanglingPort {
                        element: e.name.clone(),
                        port: None,
                    });
                }
            }
            ElementKind::SurgeTank => {
                if inlets + outlets < 1 {
                    report.push(ValidationError::DanglingPort {
                        element: e.name.clone(),
                        port: None,
                    });
                }
            }
        }
    }
}

/// Direct links that bypass a pipe.
fn check_links(net: &Network, report: &mut Vec<ValidationError>) {
    for c in &net.connections {
        let (Some(a), Some(b)) = (net.element(c.from), net.element(c.to)) else {
            continue;
        };
        let (ka, kb) = (a.kind(), b.kind());
        // Flow direction follows the ports: outlet joins inlet, except between manifolds.
        if c.from_port == c.to_port
            && !(ka == ElementKind::Manifold && kb == ElementKind::Manifold)
        {
            report.push(ValidationError::MismatchedPorts {
                from: a.name.clone(),
                to: b.name.clone(),
                port: c.from_port,
            });
        }
        let allowed = match (ka, kb) {
            (ElementKind::Pipe, ElementKind::Pipe) => false,
            (ElementKind::Pipe, _) | (_, ElementKind::Pipe) => true,
            (ElementKind::Manifold, ElementKind::Manifold) => true,
            (x, y) if x.is_reservoir() && y.is_two_sided() => true,
            (x, y) if x.is_two_sided() && y.is_reservoir() => true,
            _ => false,
        };
        if !allowed {
            report.push(ValidationError::InvalidConnection {
                from: a.name.clone(),
                to: b.name.clone(),
                reason: format!("{ka} cannot connect directly to {kb}"),
            });
        }
    }
}

fn check_manifold_loops(net: &Network, report: &mut Vec<ValidationError>) {
    let mut uf = UnionFind::<usize>::new(net.elements.len());
    for c in &net.connections {
        let (Some(a), Some(b)) = (net.element(c.from), net.element(c.to)) else {
            continue;
        };
        if a.kind() != ElementKind::Manifold || b.kind() != ElementKind::Manifold || a.id == b.id {
            continue;
        }
        let (ia, ib) = (a.id.index() as usize, b.id.index() as usize);
        if !uf.union(ia, ib) {
            let root = uf.find(ia);
            let elements = net
                .elements
                .iter()
                .filter(|e| {
                    e.kind() == ElementKind::Manifold && uf.find(e.id.index() as usize) == root
                })
                .map(|e| e.name.clone())
                .collect();
            report.push(ValidationError::CycleWithoutPipeStorage { elements });
        }
    }
}
