//! Network data structures: elements, ports and connections.

use sf_core::{ConnectionId, ElementId};
use sf_elements::{Element, ElementKind, Pipe};
use std::fmt;
use std::str::FromStr;

/// Side of an element a connection attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    /// Upstream side (node 0 of a pipe).
    Inlet,
    /// Downstream side (last node of a pipe).
    Outlet,
}

impl Port {
    pub fn as_str(self) -> &'static str {
        match self {
            Port::Inlet => "inlet",
            Port::Outlet => "outlet",
        }
    }

    pub fn opposite(self) -> Port {
        match self {
            Port::Inlet => Port::Outlet,
            Port::Outlet => Port::Inlet,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Port {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inlet" => Ok(Port::Inlet),
            "outlet" => Ok(Port::Outlet),
            other => Err(format!("unknown port '{other}'")),
        }
    }
}

/// An element placed in the network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkElement {
    pub id: ElementId,
    pub name: String,
    pub element: Element,
    /// Editor canvas position; carried through for round trips.
    pub position: [f64; 2],
}

impl NetworkElement {
    pub fn kind(&self) -> ElementKind {
        self.element.kind()
    }
}

/// Directed link between two element ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: ElementId,
    pub from_port: Port,
    pub to: ElementId,
    pub to_port: Port,
}

impl Connection {
    /// Port and peer as seen from `element`, if the connection touches it.
    pub fn seen_from(&self, element: ElementId) -> Option<Attachment> {
        if self.from == element {
            Some(Attachment {
                connection: self.id,
                port: self.from_port,
                other: self.to,
                other_port: self.to_port,
            })
        } else if self.to == element {
            Some(Attachment {
                connection: self.id,
                port: self.to_port,
                other: self.from,
                other_port: self.from_port,
            })
        } else {
            None
        }
    }
}

/// One connection as seen from one of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub connection: ConnectionId,
    /// Port on the element being inspected.
    pub port: Port,
    pub other: ElementId,
    pub other_port: Port,
}

/// Immutable network snapshot.
///
/// Elements are stored in id order; connections in insertion order. Nothing
/// about parameters is checked until [`Network::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub(crate) elements: Vec<NetworkElement>,
    pub(crate) connections: Vec<Connection>,
}

impl Network {
    pub fn elements(&self) -> &[NetworkElement] {
        &self.elements
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn element(&self, id: ElementId) -> Option<&NetworkElement> {
        self.elements.get(id.index() as usize)
    }

    /// Element display name, or the id when it does not exist.
    pub fn name_of(&self, id: ElementId) -> String {
        self.element(id)
            .map_or_else(|| format!("#{id}"), |e| e.name.clone())
    }

    pub fn element_by_name(&self, name: &str) -> Option<&NetworkElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    /// Every connection touching `id`, in connection order.
    pub fn attachments(&self, id: ElementId) -> Vec<Attachment> {
        self.connections
            .iter()
            .filter_map(|c| c.seen_from(id))
            .collect()
    }

    /// Connections on one port of `id`.
    pub fn attachments_on(&self, id: ElementId, port: Port) -> Vec<Attachment> {
        self.attachments(id)
            .into_iter()
            .filter(|a| a.port == port)
            .collect()
    }

    /// Pipes in id order.
    pub fn pipes(&self) -> impl Iterator<Item = (ElementId, &Pipe)> + '_ {
        self.elements
            .iter()
            .filter_map(|e| e.element.as_pipe().map(|p| (e.id, p)))
    }

    pub fn is_pipe(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(|e| e.kind() == ElementKind::Pipe)
    }
}
