//! Explicit method-of-characteristics time stepping.
//!
//! Each step advances every pipe's interior nodes from the C+ and C-
//! invariants of the previous level, then hands the end characteristics to
//! the boundary groups, which solve their element equations and return the
//! pipe-end heads and flows. Pipes are independent within a step, as are
//! boundary groups, so both phases can run on the rayon pool.

use crate::boundary::{BoundaryGroup, build_groups};
use crate::cancel::{CancellationToken, SolveProgress};
use crate::discretize::{Discretization, discretize_with};
use crate::error::{SolveError, SolveResult};
use crate::grid::PipeState;
use crate::options::SolveOptions;
use rayon::prelude::*;
use sf_elements::{BcResult, BoundaryConditionError, Characteristic, EndState};
use sf_network::Network;
use sf_results::{
    ElementSnapshot, NodeLayout, ResultStore, RunStatus, SimulationResult, StepSnapshot,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Lifecycle of a [`MocSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Uninitialized,
    Ready,
    Running,
    Completed,
    Aborted,
}

struct Prepared {
    options: SolveOptions,
    discretization: Discretization,
    pipes: Vec<PipeState>,
    groups: Vec<BoundaryGroup>,
    layout: NodeLayout,
}

/// Transient solver bound to one validated network.
pub struct MocSolver {
    network: Network,
    state: SolverState,
    prepared: Option<Prepared>,
}

impl std::fmt::Debug for MocSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MocSolver")
            .field("state", &self.state)
            .field("elements", &self.network.elements().len())
            .finish()
    }
}

impl MocSolver {
    pub fn new(network: &Network) -> SolveResult<Self> {
        network.validate()?;
        Ok(Self {
            network: network.clone(),
            state: SolverState::Uninitialized,
            prepared: None,
        })
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Chosen discretization, once prepared.
    pub fn discretization(&self) -> Option<&Discretization> {
        self.prepared.as_ref().map(|p| &p.discretization)
    }

    /// Discretize, build the grids and boundary groups, and set initial conditions.
    ///
    /// May be called again while `Ready` to change options.
    pub fn prepare(&mut self, options: &SolveOptions) -> SolveResult<()> {
        if !matches!(self.state, SolverState::Uninitialized | SolverState::Ready) {
            return Err(SolveError::InvalidState {
                what: format!("cannot prepare a solver in state {:?}", self.state),
            });
        }
        options
            .check()
            .map_err(|what| SolveError::InvalidArg { what })?;

        let discretization =
            discretize_with(&self.network, &options.discretization, options.dt_override)?;
        info!(
            dt = discretization.global_dt,
            pipes = discretization.pipes.len(),
            nodes = discretization.total_nodes(),
            max_celerity_adjustment = discretization.max_celerity_adjustment(),
            "discretization complete"
        );

        let order = self.network.topological_order();
        let mut pipes = Vec::new();
        let mut pipe_index = HashMap::new();
        for &id in &order {
            let Some(ne) = self.network.element(id) else {
                continue;
            };
            let (Some(pipe), Some(grid)) = (ne.element.as_pipe(), discretization.pipes.get(&id))
            else {
                continue;
            };
            pipe_index.insert(id, pipes.len());
            pipes.push(PipeState::new(
                id,
                ne.name.clone(),
                pipe.coefficients(grid.dx, grid.celerity),
                grid.reaches,
                pipe.initial_head.value,
                pipe.initial_flow.value,
            ));
        }
        let layout = NodeLayout::from_pipes(
            pipes
                .iter()
                .map(|p| (p.id, p.name.clone(), p.heads.len())),
        );

        let groups = build_groups(&self.network, &order, &pipe_index, &pipes)
            .map_err(|source| SolveError::InvalidArg {
                what: format!("boundary setup failed: {source}"),
            })?;
        debug!(groups = groups.len(), "boundary groups built");

        self.prepared = Some(Prepared {
            options: options.clone(),
            discretization,
            pipes,
            groups,
            layout,
        });
        self.state = SolverState::Ready;
        Ok(())
    }

    /// Step to the configured duration.
    ///
    /// `progress` is called after every step. The token is checked before each
    /// step; cancelling yields [`SolveError::Cancelled`] with everything
    /// recorded so far.
    pub fn run(
        &mut self,
        cancel: &CancellationToken,
        mut progress: Option<&mut dyn FnMut(SolveProgress)>,
    ) -> SolveResult<SimulationResult> {
        if self.state != SolverState::Ready {
            return Err(SolveError::InvalidState {
                what: format!("cannot run a solver in state {:?}", self.state),
            });
        }
        let Some(p) = self.prepared.as_mut() else {
            return Err(SolveError::InvalidState {
                what: "solver has not been prepared".into(),
            });
        };
        self.state = SolverState::Running;

        let dt = p.discretization.global_dt;
        let total_steps = total_steps(p.options.duration_s, dt);
        info!(dt, total_steps, duration_s = p.options.duration_s, "transient run started");

        let mut store = ResultStore::new(p.layout.clone(), dt);
        store.push(snapshot(0, 0.0, &p.pipes, &p.groups))?;
        let mut cavitating = vec![false; p.groups.len()];

        for step in 1..=total_steps {
            if cancel.is_cancelled() {
                warn!(step = step - 1, "transient run cancelled");
                self.state = SolverState::Aborted;
                return Err(SolveError::Cancelled {
                    step: step - 1,
                    partial: Box::new(store.finish(RunStatus::Cancelled)),
                });
            }

            let t = step as f64 * dt;
            if let Err(source) = advance(&mut p.pipes, &mut p.groups, t, dt, p.options.parallel) {
                warn!(step, time_s = t, error = %source, "boundary failure");
                self.state = SolverState::Aborted;
                let reason = source.to_string();
                return Err(SolveError::Boundary {
                    step,
                    time_s: t,
                    source,
                    partial: Box::new(store.finish(RunStatus::Aborted { reason })),
                });
            }

            if let Some((pipe, node, value)) =
                divergence(&p.pipes, p.options.head_limit_m, p.options.flow_limit_m3s)
            {
                warn!(step, time_s = t, pipe = %pipe, node, value, "numeric divergence");
                self.state = SolverState::Aborted;
                let reason = format!("divergence in pipe '{pipe}' node {node}");
                return Err(SolveError::NumericDivergence {
                    pipe,
                    node,
                    step,
                    time_s: t,
                    value,
                    partial: Box::new(store.finish(RunStatus::Aborted { reason })),
                });
            }

            check_cavitation(&p.groups, &p.pipes, p.options.vapour_head_m, &mut cavitating, t);

            if step % p.options.record_every as u64 == 0 || step == total_steps {
                store.push(snapshot(step, t, &p.pipes, &p.groups))?;
            }

            if let Some(cb) = progress.as_deref_mut() {
                cb(SolveProgress {
                    step,
                    total_steps,
                    time_s: t,
                    fraction: step as f64 / total_steps as f64,
                });
            }
        }

        info!(snapshots = store.len(), "transient run completed");
        self.state = SolverState::Completed;
        Ok(store.finish(RunStatus::Completed))
    }
}

/// Steps needed to reach `duration`, tolerant of round-off in `duration / dt`.
fn total_steps(duration: f64, dt: f64) -> u64 {
    (duration / dt - 1e-9).ceil().max(0.0) as u64
}

/// One full step: interior sweep, boundary solve, write-back and commit.
fn advance(
    pipes: &mut [PipeState],
    groups: &mut [BoundaryGroup],
    t: f64,
    dt: f64,
    parallel: bool,
) -> BcResult<()> {
    let chars: Vec<Vec<Characteristic>> = groups.iter().map(|g| g.characteristics(pipes)).collect();

    let solve = |(g, ch): (&mut BoundaryGroup, &Vec<Characteristic>)| -> BcResult<Vec<EndState>> {
        let out = g.bc.boundary_equation(ch, t, dt)?;
        if out.len() != g.ends.len() {
            return Err(BoundaryConditionError::Unsolvable {
                element: g.bc.name().to_string(),
                reason: format!("returned {} end states for {} pipe ends", out.len(), g.ends.len()),
            });
        }
        Ok(out)
    };
    let solved: Vec<Vec<EndState>> = if parallel {
        pipes.par_iter_mut().for_each(PipeState::sweep_interior);
        groups
            .par_iter_mut()
            .zip(chars.par_iter())
            .map(solve)
            .collect::<BcResult<_>>()?
    } else {
        pipes.iter_mut().for_each(PipeState::sweep_interior);
        groups
            .iter_mut()
            .zip(chars.iter())
            .map(solve)
            .collect::<BcResult<_>>()?
    };

    for (g, states) in groups.iter().zip(solved) {
        for (end, state) in g.ends.iter().zip(states) {
            pipes[end.pipe].set_end(end.side, state);
        }
    }
    pipes.iter_mut().for_each(PipeState::commit);
    Ok(())
}

fn divergence(pipes: &[PipeState], head_limit: f64, flow_limit: f64) -> Option<(String, u32, f64)> {
    pipes.iter().find_map(|p| {
        p.first_divergent(head_limit, flow_limit)
            .map(|(node, value)| (p.name.clone(), node as u32, value))
    })
}

/// Warn once per element when an attached end drops below vapour head.
fn check_cavitation(
    groups: &[BoundaryGroup],
    pipes: &[PipeState],
    vapour_head: f64,
    warned: &mut [bool],
    t: f64,
) {
    for (i, g) in groups.iter().enumerate() {
        if warned[i] {
            continue;
        }
        let Some(z) = g.bc.elevation() else {
            continue;
        };
        if let Some(lowest) = g
            .end_states(pipes)
            .iter()
            .map(|e| e.head - z)
            .reduce(f64::min)
            && lowest < vapour_head
        {
            warn!(
                element = %g.bc.name(),
                time_s = t,
                pressure_head = lowest,
                "pressure below vapour head, column separation is not modelled"
            );
            warned[i] = true;
        }
    }
}

fn snapshot(step: u64, t: f64, pipes: &[PipeState], groups: &[BoundaryGroup]) -> StepSnapshot {
    StepSnapshot {
        step,
        time_s: t,
        heads: pipes.iter().flat_map(|p| p.heads.iter().copied()).collect(),
        flows: pipes.iter().flat_map(|p| p.flows.iter().copied()).collect(),
        elements: groups
            .iter()
            .map(|g| ElementSnapshot {
                name: g.bc.name().to_string(),
                kind: g.bc.kind().as_str().to_string(),
                values: g
                    .bc
                    .observables()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            })
            .collect(),
    }
}

/// Discretize and run `network` for `duration_s` with default options.
pub fn run(
    network: &Network,
    duration_s: f64,
    dt_override: Option<f64>,
) -> SolveResult<SimulationResult> {
    let options = SolveOptions {
        duration_s,
        dt_override,
        ..SolveOptions::default()
    };
    run_with(network, &options, &CancellationToken::new(), None)
}

/// Run with explicit options, cancellation and progress reporting.
pub fn run_with(
    network: &Network,
    options: &SolveOptions,
    cancel: &CancellationToken,
    progress: Option<&mut dyn FnMut(SolveProgress)>,
) -> SolveResult<SimulationResult> {
    let mut solver = MocSolver::new(network)?;
    solver.prepare(options)?;
    solver.run(cancel, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_count_tolerates_round_off() {
        assert_eq!(total_steps(1.0, 0.1), 10);
        assert_eq!(total_steps(1.05, 0.1), 11);
        assert_eq!(total_steps(0.0, 0.1), 0);
        assert_eq!(total_steps(0.3, 0.1), 3);
    }
}
