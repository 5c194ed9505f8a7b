//! sf-network: network model layer for surgeflow.
//!
//! Provides:
//! - Elements, ports and connections (`Network`)
//! - Incremental builder (`NetworkBuilder`)
//! - Validation of parameters and topology
//! - Deterministic traversal order and manifold junction groups
//!
//! # Example
//!
//! ```
//! use sf_core::units::{m, m3ps, mps};
//! use sf_elements::{Element, Pipe, Reservoir};
//! use sf_network::NetworkBuilder;
//!
//! let mut b = NetworkBuilder::new();
//! let r1 = b.add_element("R1", Element::InletReservoir(Reservoir::new(m(100.0), m(90.0))));
//! let p1 = b.add_element(
//!     "P1",
//!     Element::Pipe(Pipe {
//!         diameter: m(1.0),
//!         length: m(1000.0),
//!         wave_celerity: mps(1000.0),
//!         manning_n: 0.012,
//!         reaches: 4,
//!         initial_head: m(100.0),
//!         initial_flow: m3ps(0.0),
//!         dt_max: None,
//!     }),
//! );
//! let r2 = b.add_element("R2", Element::OutletReservoir(Reservoir::new(m(80.0), m(70.0))));
//! b.chain(r1, p1);
//! b.chain(p1, r2);
//! let net = b.build().unwrap();
//!
//! assert!(net.validate().is_ok());
//! assert_eq!(net.topological_order(), vec![r1, p1, r2]);
//! ```

pub mod builder;
pub mod error;
pub mod network;
mod topology;
mod validate;

pub use builder::NetworkBuilder;
pub use error::{ValidationError, ValidationResult};
pub use network::{Attachment, Connection, Network, NetworkElement, Port};
