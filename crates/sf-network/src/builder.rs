//! Incremental network builder.

use sf_core::{ConnectionId, ElementId};
use sf_elements::Element;

use crate::error::{ValidationError, ValidationResult};
use crate::network::{Connection, Network, NetworkElement, Port};

/// Builder for constructing a network incrementally.
///
/// Use `add_element` and `connect` to build up the network, then call
/// `build()` to check references and freeze it into an immutable `Network`.
/// Parameter and topology rules are checked later by `Network::validate`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    elements: Vec<NetworkElement>,
    connections: Vec<Connection>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element and return its id.
    pub fn add_element(&mut self, name: impl Into<String>, element: Element) -> ElementId {
        self.add_element_at(name, element, [0.0, 0.0])
    }

    /// Add an element with an editor canvas position.
    pub fn add_element_at(
        &mut self,
        name: impl Into<String>,
        element: Element,
        position: [f64; 2],
    ) -> ElementId {
        let id = ElementId::from_index(self.elements.len() as u32);
        self.elements.push(NetworkElement {
            id,
            name: name.into(),
            element,
            position,
        });
        id
    }

    /// Connect `from.from_port` to `to.to_port`.
    pub fn connect(
        &mut self,
        from: ElementId,
        from_port: Port,
        to: ElementId,
        to_port: Port,
    ) -> ConnectionId {
        let id = ConnectionId::from_index(self.connections.len() as u32);
        self.connections.push(Connection {
            id,
            from,
            from_port,
            to,
            to_port,
        });
        id
    }

    /// Connect two elements by name.
    pub fn connect_names(
        &mut self,
        from: &str,
        from_port: Port,
        to: &str,
        to_port: Port,
    ) -> ValidationResult<ConnectionId> {
        let from_id = self.lookup(from)?;
        let to_id = self.lookup(to)?;
        Ok(self.connect(from_id, from_port, to_id, to_port))
    }

    /// `from.outlet -> to.inlet`, the usual downstream link.
    pub fn chain(&mut self, from: ElementId, to: ElementId) -> ConnectionId {
        self.connect(from, Port::Outlet, to, Port::Inlet)
    }

    fn lookup(&self, name: &str) -> ValidationResult<ElementId> {
        self.elements
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.id)
            .ok_or_else(|| ValidationError::UnknownElement {
                name: name.to_string(),
            })
    }

    /// Freeze the network. Fails only when a connection names an element
    /// that was never added.
    pub fn build(self) -> ValidationResult<Network> {
        for c in &self.connections {
            for id in [c.from, c.to] {
                if id.index() as usize >= self.elements.len() {
                    return Err(ValidationError::UnknownElement {
                        name: format!("#{id}"),
                    });
                }
            }
        }
        Ok(Network {
            elements: self.elements,
            connections: self.connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sf_core::units::m;
    use sf_elements::{Manifold, Reservoir};

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut b = NetworkBuilder::new();
        let r = b.add_element("R1", Element::InletReservoir(Reservoir::new(m(10.0), m(0.0))));
        let j = b.add_element("M1", Element::Manifold(Manifold::new(m(0.0))));
        let c = b.chain(r, j);
        assert_eq!(r.index(), 0);
        assert_eq!(j.index(), 1);
        assert_eq!(c.index(), 0);

        let net = b.build().unwrap();
        assert_eq!(net.elements().len(), 2);
        assert_eq!(net.connections().len(), 1);
        assert_eq!(net.attachments(j)[0].other, r);
    }

    #[test]
    fn connect_by_unknown_name_fails() {
        let mut b = NetworkBuilder::new();
        b.add_element("M1", Element::Manifold(Manifold::new(m(0.0))));
        let err = b
            .connect_names("M1", Port::Outlet, "M9", Port::Inlet)
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownElement { name: "M9".into() });
    }

    #[test]
    fn build_rejects_dangling_id() {
        let mut b = NetworkBuilder::new();
        let a = b.add_element("M1", Element::Manifold(Manifold::new(m(0.0))));
        b.chain(a, ElementId::from_index(7));
        assert!(matches!(
            b.build(),
            Err(ValidationError::UnknownElement { .. })
        ));
    }
}
