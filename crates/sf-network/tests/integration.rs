//! Integration tests for sf-network.

use proptest::prelude::*;
use sf_core::ElementId;
use sf_core::units::{m, m2, m3ps, mps, s};
use sf_elements::{
    Element, Manifold, OpeningSchedule, Pipe, Reservoir, SurgeTank, Valve,
};
use sf_network::{NetworkBuilder, Port, ValidationError};

fn pipe() -> Element {
    Element::Pipe(Pipe {
        diameter: m(1.0),
        length: m(1000.0),
        wave_celerity: mps(1000.0),
        manning_n: 0.012,
        reaches: 4,
        initial_head: m(100.0),
        initial_flow: m3ps(0.0),
        dt_max: Some(s(0.0)),
    })
}

fn inlet(level: f64) -> Element {
    Element::InletReservoir(Reservoir::new(m(level), m(level - 10.0)))
}

fn outlet(level: f64) -> Element {
    Element::OutletReservoir(Reservoir::new(m(level), m(level - 10.0)))
}

fn valve() -> Element {
    Element::Valve(Valve {
        diameter: m(0.5),
        loss_coefficient: 1.0,
        loss_exponent: 2.0,
        elevation: m(0.0),
        opening_schedule: OpeningSchedule::constant(1.0),
    })
}

fn manifold() -> Element {
    Element::Manifold(Manifold::new(m(0.0)))
}

#[test]
fn reservoir_pipe_reservoir_is_valid() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, r2);
    let net = b.build().unwrap();

    assert!(net.validate().is_ok());
    assert_eq!(net.pipes().count(), 1);
    assert_eq!(net.element_by_name("P1").unwrap().id, p1);
    let att = net.attachments(p1);
    assert_eq!(att.len(), 2);
    assert_eq!(att[0].port, Port::Inlet);
    assert_eq!(att[1].port, Port::Outlet);
}

#[test]
fn dangling_pipe_outlet_reported() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    b.chain(r1, p1);
    let net = b.build().unwrap();

    assert_eq!(
        net.validate().unwrap_err(),
        ValidationError::DanglingPort {
            element: "P1".into(),
            port: Some(Port::Outlet),
        }
    );
}

#[test]
fn overloaded_pipe_inlet_reported() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let r2 = b.add_element("R2", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let r3 = b.add_element("R3", outlet(80.0));
    b.chain(r1, p1);
    b.chain(r2, p1);
    b.chain(p1, r3);
    let report = b.build().unwrap().validation_report();
    assert!(report.contains(&ValidationError::PortOverloaded {
        element: "P1".into(),
        port: Port::Inlet,
        count: 2,
    }));
    // R2 is fine on its own: one connection on its outlet
    assert_eq!(report.len(), 1);
}

#[test]
fn duplicate_names_and_empty_network() {
    assert_eq!(
        NetworkBuilder::new().build().unwrap().validate(),
        Err(ValidationError::EmptyNetwork)
    );

    let mut b = NetworkBuilder::new();
    b.add_element("X", manifold());
    b.add_element("X", manifold());
    let report = b.build().unwrap().validation_report();
    assert_eq!(report[0], ValidationError::DuplicateName { name: "X".into() });
}

#[test]
fn missing_parameter_names_field() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let mut bad = pipe();
    if let Element::Pipe(p) = &mut bad {
        p.length = m(0.0);
    }
    let p1 = b.add_element("P1", bad);
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, r2);
    assert_eq!(
        b.build().unwrap().validate().unwrap_err(),
        ValidationError::MissingParameter {
            element: "P1".into(),
            field: "length".into(),
        }
    );
}

#[test]
fn pipe_to_pipe_link_rejected() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let p2 = b.add_element("P2", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, p2);
    b.chain(p2, r2);
    let report = b.build().unwrap().validation_report();
    assert!(matches!(
        report.as_slice(),
        [ValidationError::InvalidConnection { from, to, .. }] if from == "P1" && to == "P2"
    ));
}

#[test]
fn reservoir_valve_free_discharge_needs_a_pipe() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let v1 = b.add_element("V1", valve());
    b.chain(r1, v1);
    let report = b.build().unwrap().validation_report();
    assert_eq!(report.len(), 1);
    assert!(matches!(report[0], ValidationError::InvalidConnection { .. }));
}

#[test]
fn reservoir_valve_pipe_is_valid() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let v1 = b.add_element("V1", valve());
    let p1 = b.add_element("P1", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, v1);
    b.chain(v1, p1);
    b.chain(p1, r2);
    let net = b.build().unwrap();
    assert_eq!(net.validate(), Ok(()));
    assert_eq!(net.topological_order(), vec![r1, v1, p1, r2]);
}

#[test]
fn manifold_loop_without_pipe_rejected() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let m1 = b.add_element("M1", manifold());
    let m2 = b.add_element("M2", manifold());
    let m3 = b.add_element("M3", manifold());
    let p2 = b.add_element("P2", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, m1);
    b.chain(m1, m2);
    b.chain(m2, m3);
    b.chain(m3, m1);
    b.chain(m3, p2);
    b.chain(p2, r2);
    let net = b.build().unwrap();
    assert_eq!(
        net.validate().unwrap_err(),
        ValidationError::CycleWithoutPipeStorage {
            elements: vec!["M1".into(), "M2".into(), "M3".into()],
        }
    );
    assert_eq!(net.junction_groups(), vec![vec![m1, m2, m3]]);
}

#[test]
fn junction_groups_merge_linked_manifolds() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let m1 = b.add_element("M1", manifold());
    let m2 = b.add_element("M2", manifold());
    let p2 = b.add_element("P2", pipe());
    let p3 = b.add_element("P3", pipe());
    let m3 = b.add_element("M3", manifold());
    let p4 = b.add_element("P4", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, m1);
    b.chain(m1, m2);
    b.chain(m2, p2);
    b.chain(m2, p3);
    b.chain(p2, m3);
    b.chain(p3, m3);
    b.chain(m3, p4);
    b.chain(p4, r2);
    let net = b.build().unwrap();
    assert_eq!(net.validate(), Ok(()));
    assert_eq!(net.junction_groups(), vec![vec![m1, m2], vec![m3]]);
}

#[test]
fn surge_tank_needs_a_connection() {
    let mut b = NetworkBuilder::new();
    b.add_element(
        "S1",
        Element::SurgeTank(SurgeTank {
            throttle_area: m2(1.0),
            tank_area: m2(20.0),
            throttle_k_in: 1.0,
            throttle_k_out: 1.0,
            base_elevation: m(50.0),
        }),
    );
    assert_eq!(
        b.build().unwrap().validate().unwrap_err(),
        ValidationError::DanglingPort {
            element: "S1".into(),
            port: None,
        }
    );
}

#[test]
fn reservoir_wrong_port_rejected() {
    let mut b = NetworkBuilder::new();
    let p1 = b.add_element("P1", pipe());
    let r1 = b.add_element("R1", inlet(100.0));
    let r2 = b.add_element("R2", outlet(80.0));
    // Pipe outlet into the inlet reservoir's (non-existent) inlet
    b.connect(p1, Port::Outlet, r1, Port::Inlet);
    b.connect(r2, Port::Inlet, p1, Port::Inlet);
    let report = b.build().unwrap().validation_report();
    assert!(report.iter().any(|e| matches!(
        e,
        ValidationError::InvalidConnection { from, .. } if from == "R1"
    )));
}

#[test]
fn same_kind_port_links_rejected() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    // Pipe wired backwards: its outlet faces the upstream reservoir
    b.connect(r1, Port::Outlet, p1, Port::Outlet);
    b.connect(p1, Port::Inlet, r2, Port::Inlet);
    let net = b.build().unwrap();
    assert_eq!(
        net.validate().unwrap_err(),
        ValidationError::MismatchedPorts {
            from: "R1".into(),
            to: "P1".into(),
            port: Port::Outlet,
        }
    );
    let mismatched: Vec<_> = net
        .validation_report()
        .into_iter()
        .filter(|e| matches!(e, ValidationError::MismatchedPorts { .. }))
        .collect();
    assert_eq!(mismatched.len(), 2);
    assert_eq!(mismatched[1].element(), Some("P1"));
}

#[test]
fn manifold_links_ignore_port_names() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe());
    let m1 = b.add_element("M1", manifold());
    let m2 = b.add_element("M2", manifold());
    let p2 = b.add_element("P2", pipe());
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, m1);
    b.connect(m1, Port::Outlet, m2, Port::Outlet);
    b.chain(m2, p2);
    b.chain(p2, r2);
    assert_eq!(b.build().unwrap().validate(), Ok(()));
}

proptest! {
    #[test]
    fn topological_order_is_a_permutation(n in 1usize..12, extra in 0usize..6) {
        let mut b = NetworkBuilder::new();
        let mut ids = Vec::new();
        for i in 0..n {
            ids.push(b.add_element(format!("M{i}"), manifold()));
        }
        for w in ids.windows(2) {
            b.chain(w[0], w[1]);
        }
        for i in 0..extra {
            b.add_element(format!("X{i}"), manifold());
        }
        let net = b.build().unwrap();
        let mut order = net.topological_order();
        prop_assert_eq!(order.len(), n + extra);
        order.sort();
        let expected: Vec<ElementId> = (0..(n + extra) as u32).map(ElementId::from_index).collect();
        prop_assert_eq!(order, expected);
    }
}
