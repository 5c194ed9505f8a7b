//! End-to-end transient runs against closed-form results.

use sf_core::units::constants::G0_MPS2;
use sf_core::units::{kgm2, m, m2, m3ps, mps, rpm};
use sf_elements::{
    Element, GovernorParams, Manifold, OpeningSchedule, Pipe, Reservoir, RunnerType, SurgeTank,
    Turbine, Valve,
};
use sf_moc::{
    CancellationToken, MocSolver, SolveError, SolveOptions, SolveProgress, SolverState, run,
    run_with,
};
use sf_network::{Network, NetworkBuilder};
use sf_results::RunStatus;
use std::f64::consts::PI;

fn pipe(diameter: f64, manning_n: f64, reaches: u32, q0: f64) -> Element {
    Element::Pipe(Pipe {
        diameter: m(diameter),
        length: m(1000.0),
        wave_celerity: mps(1000.0),
        manning_n,
        reaches,
        initial_head: m(100.0),
        initial_flow: m3ps(q0),
        dt_max: None,
    })
}

fn inlet(level: f64) -> Element {
    Element::InletReservoir(Reservoir::new(m(level), m(0.0)))
}

fn outlet(level: f64) -> Element {
    Element::OutletReservoir(Reservoir::new(m(level), m(0.0)))
}

/// Valve passing 1 m³/s under 20 m when open, closed instantly at t = 0.
fn closing_valve(kv: f64) -> Element {
    Element::Valve(Valve {
        diameter: m(0.5),
        loss_coefficient: kv,
        loss_exponent: 2.0,
        elevation: m(0.0),
        opening_schedule: OpeningSchedule::new(vec![(0.0, 1.0), (0.0, 0.0)]),
    })
}

fn valve_kv_for_unit_flow() -> f64 {
    let area = PI * 0.25 * 0.25;
    2.0 * G0_MPS2 * 20.0 * area * area
}

/// R1 (100 m) -> P1 -> V1 -> R2 (80 m), frictionless, 1 m³/s.
fn valve_closure_network() -> Network {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe(1.0, 0.0, 10, 1.0));
    let v1 = b.add_element("V1", closing_valve(valve_kv_for_unit_flow()));
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, v1);
    b.chain(v1, r2);
    b.build().unwrap()
}

fn p1_id(net: &Network) -> sf_core::ElementId {
    net.element_by_name("P1").unwrap().id
}

#[test]
fn instant_closure_matches_joukowsky() {
    let net = valve_closure_network();
    let result = run(&net, 1.5, None).unwrap();
    assert_eq!(result.status(), &RunStatus::Completed);
    assert!((result.dt_s() - 0.1).abs() < 1e-12);
    assert_eq!(result.snapshots().len(), 16);

    let area = PI / 4.0;
    let joukowsky = 1000.0 * 1.0 / (G0_MPS2 * area);
    let rise = result.max_head(p1_id(&net), 10).unwrap().unwrap() - 100.0;
    assert!(
        (rise - joukowsky).abs() / joukowsky < 0.01,
        "rise {rise}, expected {joukowsky}"
    );

    let valve_flow = result.element_series("V1", "flow");
    assert_eq!(valve_flow.len(), 16);
    assert!(valve_flow[1..].iter().all(|&(_, q)| q == 0.0));
    // Upstream reservoir end never moves
    let head0 = result.node_series(p1_id(&net), 0).unwrap();
    assert!(head0.iter().all(|s| (s.head_m - 100.0).abs() < 1e-9));
}

#[test]
fn reservoirs_settle_to_darcy_weisbach_flow() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe(1.0, 0.012, 4, 0.0));
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, r2);
    let net = b.build().unwrap();

    let result = run(&net, 300.0, None).unwrap();
    let Element::Pipe(p) = &net.element(p1).unwrap().element else {
        unreachable!()
    };
    let area = p.area_m2();
    let expected = area * (2.0 * G0_MPS2 * 1.0 * 20.0 / (p.friction_factor() * 1000.0)).sqrt();
    let last = result.final_snapshot().unwrap();
    for &q in &last.flows {
        assert!((q - expected).abs() / expected < 0.01, "flow {q}, expected {expected}");
    }
    assert!((last.heads[0] - 100.0).abs() < 1e-9);
    assert!((last.heads[4] - 80.0).abs() < 1e-9);
}

#[test]
fn manifold_conserves_flow_every_step() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe(1.0, 0.012, 4, 0.0));
    let m1 = b.add_element("M1", Element::Manifold(Manifold::new(m(0.0))));
    let p2 = b.add_element("P2", pipe(0.8, 0.012, 4, 0.0));
    let p3 = b.add_element("P3", pipe(0.6, 0.012, 4, 0.0));
    let r2 = b.add_element("R2", outlet(80.0));
    let r3 = b.add_element("R3", outlet(70.0));
    b.chain(r1, p1);
    b.chain(p1, m1);
    b.chain(m1, p2);
    b.chain(m1, p3);
    b.chain(p2, r2);
    b.chain(p3, r3);
    let net = b.build().unwrap();

    let result = run(&net, 20.0, None).unwrap();
    let layout = result.layout();
    let idx = |pipe, node| layout.index_of(sf_core::NodeRef::new(pipe, node)).unwrap();
    let (in_end, out2, out3) = (idx(p1, 4), idx(p2, 0), idx(p3, 0));
    for snap in result.snapshots() {
        let imbalance = snap.flows[in_end] - snap.flows[out2] - snap.flows[out3];
        assert!(imbalance.abs() < 1e-6, "step {}: {imbalance}", snap.step);
        assert!((snap.heads[in_end] - snap.heads[out2]).abs() < 1e-9);
        assert!((snap.heads[in_end] - snap.heads[out3]).abs() < 1e-9);
    }
    assert!(result.final_snapshot().unwrap().flows[in_end] > 0.0);
}

#[test]
fn surge_tank_fills_after_downstream_closure() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe(1.0, 0.0, 4, 1.0));
    let st = b.add_element(
        "ST1",
        Element::SurgeTank(SurgeTank {
            throttle_area: m2(1.0),
            tank_area: m2(10.0),
            throttle_k_in: 0.5,
            throttle_k_out: 0.5,
            base_elevation: m(50.0),
        }),
    );
    let p2 = b.add_element("P2", pipe(1.0, 0.0, 4, 1.0));
    let v1 = b.add_element("V1", closing_valve(valve_kv_for_unit_flow()));
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, st);
    b.chain(st, p2);
    b.chain(p2, v1);
    b.chain(v1, r2);
    let net = b.build().unwrap();

    let result = run(&net, 5.0, None).unwrap();
    let level = result.element_series("ST1", "level");
    let (_, initial) = level[0];
    let (_, last) = level[level.len() - 1];
    assert!((initial - 50.0).abs() < 1e-9);
    assert!(last > initial + 0.1, "level {initial} -> {last}");
}

#[test]
fn turbine_load_rejection_overspeeds_and_closes_gate() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe(2.0, 0.0, 10, 5.0));
    let t1 = b.add_element(
        "T1",
        Element::Turbine(Turbine {
            rated_head: m(100.0),
            rated_flow: m3ps(10.0),
            rated_diameter: m(2.0),
            rated_speed: rpm(300.0),
            inertia: kgm2(2.0e5),
            efficiency: 0.9,
            elevation: m(0.0),
            runner: RunnerType::Francis,
            governor: GovernorParams {
                load_rejection_fraction: -1.0,
                rejection_time_s: 0.5,
                ramp_time_s: 0.0,
                tg_s: 0.2,
                td_s: 0.0,
                tr_s: 5.0,
                bp: 0.04,
                kp: 5.0,
                ..GovernorParams::default()
            },
        }),
    );
    b.chain(r1, p1);
    b.chain(p1, t1);
    let net = b.build().unwrap();

    let result = run(&net, 5.0, None).unwrap();
    let gate = result.element_series("T1", "gate");
    let speed = result.element_series("T1", "speed_rpm");
    assert!((gate[0].1 - 0.5).abs() < 1e-9);
    assert!((speed[0].1 - 300.0).abs() < 1e-9);

    let peak = speed.iter().map(|&(_, v)| v).fold(f64::MIN, f64::max);
    assert!(peak > 303.0, "peak speed {peak}");
    assert!(gate[gate.len() - 1].1 < 0.45);
}

#[test]
fn zero_loss_coefficient_aborts_with_partial_result() {
    let mut b = NetworkBuilder::new();
    let r1 = b.add_element("R1", inlet(100.0));
    let p1 = b.add_element("P1", pipe(1.0, 0.0, 10, 1.0));
    let v1 = b.add_element(
        "V1",
        Element::Valve(Valve {
            diameter: m(0.5),
            loss_coefficient: 0.0,
            loss_exponent: 2.0,
            elevation: m(0.0),
            opening_schedule: OpeningSchedule::constant(1.0),
        }),
    );
    let r2 = b.add_element("R2", outlet(80.0));
    b.chain(r1, p1);
    b.chain(p1, v1);
    b.chain(v1, r2);
    let net = b.build().unwrap();

    let err = run(&net, 1.0, None).unwrap_err();
    let SolveError::Boundary { step, partial, .. } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(*step, 1);
    assert_eq!(partial.snapshots().len(), 1);
    assert!(matches!(partial.status(), RunStatus::Aborted { .. }));
}

#[test]
fn head_limit_reports_divergence() {
    let net = valve_closure_network();
    let opts = SolveOptions {
        duration_s: 1.0,
        head_limit_m: 150.0,
        ..SolveOptions::default()
    };
    let err = run_with(&net, &opts, &CancellationToken::new(), None).unwrap_err();
    match &err {
        SolveError::NumericDivergence {
            pipe,
            node,
            step,
            value,
            ..
        } => {
            assert_eq!(pipe, "P1");
            assert_eq!(*node, 10);
            assert_eq!(*step, 1);
            assert!(*value > 150.0);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.partial().unwrap().snapshots().len(), 1);
}

#[test]
fn cancellation_from_progress_callback() {
    let net = valve_closure_network();
    let token = CancellationToken::new();
    let handle = token.clone();
    let mut seen = Vec::new();
    let mut on_progress = |p: SolveProgress| {
        seen.push(p.step);
        if p.step == 3 {
            handle.cancel();
        }
    };
    let opts = SolveOptions::with_duration(1.0);
    let err = run_with(&net, &opts, &token, Some(&mut on_progress)).unwrap_err();
    let SolveError::Cancelled { step, partial } = err else {
        panic!("expected cancellation");
    };
    assert_eq!(step, 3);
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(partial.snapshots().len(), 4);
    assert_eq!(partial.status(), &RunStatus::Cancelled);
}

#[test]
fn progress_reaches_completion() {
    let net = valve_closure_network();
    let mut last = None;
    let mut on_progress = |p: SolveProgress| last = Some(p);
    run_with(
        &net,
        &SolveOptions::with_duration(1.0),
        &CancellationToken::new(),
        Some(&mut on_progress),
    )
    .unwrap();
    let last = last.unwrap();
    assert_eq!(last.step, 10);
    assert_eq!(last.total_steps, 10);
    assert!((last.fraction - 1.0).abs() < 1e-12);
}

#[test]
fn decimation_keeps_first_and_last_step() {
    let net = valve_closure_network();
    let opts = SolveOptions {
        duration_s: 1.5,
        record_every: 4,
        ..SolveOptions::default()
    };
    let result = run_with(&net, &opts, &CancellationToken::new(), None).unwrap();
    let steps: Vec<u64> = result.snapshots().iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![0, 4, 8, 12, 15]);
}

#[test]
fn serial_and_parallel_runs_agree() {
    let net = valve_closure_network();
    let parallel = SolveOptions::with_duration(2.0);
    let serial = SolveOptions {
        parallel: false,
        ..parallel.clone()
    };
    let token = CancellationToken::new();
    let a = run_with(&net, &parallel, &token, None).unwrap();
    let b = run_with(&net, &serial, &token, None).unwrap();
    assert_eq!(a.snapshots(), b.snapshots());
}

#[test]
fn solver_lifecycle() {
    let net = valve_closure_network();
    let mut solver = MocSolver::new(&net).unwrap();
    assert_eq!(solver.state(), SolverState::Uninitialized);
    assert!(matches!(
        solver.run(&CancellationToken::new(), None),
        Err(SolveError::InvalidState { .. })
    ));

    solver.prepare(&SolveOptions::with_duration(0.5)).unwrap();
    assert_eq!(solver.state(), SolverState::Ready);
    assert_eq!(solver.discretization().unwrap().pipes.len(), 1);
    // Preparing again while ready replaces the options
    solver.prepare(&SolveOptions::with_duration(0.3)).unwrap();

    let result = solver.run(&CancellationToken::new(), None).unwrap();
    assert_eq!(result.snapshots().len(), 4);
    assert_eq!(solver.state(), SolverState::Completed);
    assert!(matches!(
        solver.prepare(&SolveOptions::default()),
        Err(SolveError::InvalidState { .. })
    ));
}

#[test]
fn zero_duration_records_initial_state_only() {
    let net = valve_closure_network();
    let result = run(&net, 0.0, None).unwrap();
    assert_eq!(result.snapshots().len(), 1);
    assert!(result.status().is_completed());
}

#[test]
fn invalid_options_rejected_before_running() {
    let net = valve_closure_network();
    let mut solver = MocSolver::new(&net).unwrap();
    let err = solver
        .prepare(&SolveOptions {
            record_every: 0,
            ..SolveOptions::default()
        })
        .unwrap_err();
    assert!(matches!(err, SolveError::InvalidArg { .. }));
    assert_eq!(solver.state(), SolverState::Uninitialized);
}
