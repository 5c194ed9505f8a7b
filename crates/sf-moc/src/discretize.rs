//! Global time-step selection.
//!
//! Every pipe must satisfy `Δx = a Δt` with an integer number of reaches. A
//! pipe's wave speed may be nudged within a tolerance to make its travel time
//! an integer multiple of the common step:
//!
//! ```text
//! T_p  = L_p / a_p
//! N_p  = max(reaches_p, round(T_p / Δt))
//! a'_p = L_p / (N_p Δt)          |a'_p / a_p - 1| <= tolerance
//! ```
//!
//! Candidate steps are `T_q / n` for each pipe `q`; the largest feasible one wins.

use crate::error::{DiscretizationError, DiscretizationResult};
use crate::options::DiscretizationConfig;
use sf_core::{ElementId, Tolerances, nearly_equal};
use sf_network::Network;
use std::collections::BTreeMap;
use tracing::debug;

/// Grid of one pipe at the chosen step.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeGrid {
    pub reaches: u32,
    /// Reach length (m).
    pub dx: f64,
    /// Adjusted wave speed (m/s); `dx / dt` exactly.
    pub celerity: f64,
    /// Relative change applied to the wave speed, `a'/a - 1`.
    pub celerity_adjustment: f64,
}

impl PipeGrid {
    pub fn node_count(&self) -> usize {
        self.reaches as usize + 1
    }
}

/// Chosen time step and per-pipe grids.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretization {
    pub global_dt: f64,
    pub pipes: BTreeMap<ElementId, PipeGrid>,
}

impl Discretization {
    pub fn total_nodes(&self) -> usize {
        self.pipes.values().map(PipeGrid::node_count).sum()
    }

    /// Largest |a'/a - 1| over all pipes.
    pub fn max_celerity_adjustment(&self) -> f64 {
        self.pipes
            .values()
            .map(|g| g.celerity_adjustment.abs())
            .fold(0.0, f64::max)
    }
}

struct PipeTiming<'a> {
    id: ElementId,
    name: &'a str,
    length: f64,
    celerity: f64,
    travel_time: f64,
    min_reaches: u32,
}

enum Evaluation {
    Feasible(BTreeMap<ElementId, PipeGrid>),
    /// Worst relative misfit and the pipe it occurred in.
    Infeasible(f64, usize),
}

fn evaluate(pipes: &[PipeTiming<'_>], dt: f64, config: &DiscretizationConfig) -> Evaluation {
    let mut grids = BTreeMap::new();
    let mut worst = (0.0, 0);
    let mut feasible = true;
    for (i, p) in pipes.iter().enumerate() {
        let n = (p.travel_time / dt).round().max(1.0) as u32;
        let reaches = n.max(p.min_reaches);
        let adjusted = p.length / (f64::from(reaches) * dt);
        let adjustment = adjusted / p.celerity - 1.0;
        // Too many reaches counts as worse than any celerity misfit
        let misfit = if reaches > config.max_reaches {
            f64::INFINITY
        } else {
            adjustment.abs()
        };
        if misfit > worst.0 {
            worst = (misfit, i);
        }
        if misfit > config.celerity_tolerance {
            feasible = false;
            continue;
        }
        grids.insert(
            p.id,
            PipeGrid {
                reaches,
                dx: p.length / f64::from(reaches),
                celerity: adjusted,
                celerity_adjustment: adjustment,
            },
        );
    }
    if feasible {
        Evaluation::Feasible(grids)
    } else {
        Evaluation::Infeasible(worst.0, worst.1)
    }
}

/// Discretize with default settings.
pub fn discretize(network: &Network) -> DiscretizationResult<Discretization> {
    discretize_with(network, &DiscretizationConfig::default(), None)
}

/// Discretize with explicit settings, optionally forcing the time step.
pub fn discretize_with(
    network: &Network,
    config: &DiscretizationConfig,
    dt_override: Option<f64>,
) -> DiscretizationResult<Discretization> {
    if !(config.celerity_tolerance >= 0.0 && config.celerity_tolerance.is_finite()) {
        return Err(DiscretizationError::InvalidConfig {
            what: "celerity tolerance must be a non-negative number".into(),
        });
    }
    if config.max_reaches == 0 {
        return Err(DiscretizationError::InvalidConfig {
            what: "max_reaches must be at least 1".into(),
        });
    }
    network.validate()?;

    let names: BTreeMap<ElementId, &str> = network
        .elements()
        .iter()
        .map(|e| (e.id, e.name.as_str()))
        .collect();
    let pipes: Vec<PipeTiming<'_>> = network
        .pipes()
        .map(|(id, p)| PipeTiming {
            id,
            name: names.get(&id).copied().unwrap_or_default(),
            length: p.length.value,
            celerity: p.wave_celerity.value,
            travel_time: p.travel_time_s(),
            min_reaches: p.reaches,
        })
        .collect();
    if pipes.is_empty() {
        return Err(DiscretizationError::InvalidConfig {
            what: "network has no pipes".into(),
        });
    }

    let dt_cap = network
        .pipes()
        .map(|(_, p)| {
            let courant = p.travel_time_s() / f64::from(p.reaches);
            p.dt_max_s().map_or(courant, |m| m.min(courant))
        })
        .fold(f64::INFINITY, f64::min);

    let candidates: Vec<f64> = match dt_override {
        Some(dt) => {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(DiscretizationError::InvalidConfig {
                    what: format!("dt override must be positive, got {dt}"),
                });
            }
            vec![dt]
        }
        None => {
            let mut c: Vec<f64> = pipes
                .iter()
                .flat_map(|p| {
                    (1..=config.max_reaches)
                        .map(move |n| p.travel_time / f64::from(n))
                        .filter(|&dt| dt <= dt_cap * (1.0 + 1e-12))
                })
                .collect();
            c.sort_by(|a, b| b.total_cmp(a));
            let tol = Tolerances { abs: 0.0, rel: 1e-12 };
            c.dedup_by(|a, b| nearly_equal(*a, *b, tol));
            c
        }
    };

    let mut closest: Option<(f64, usize)> = None;
    for &dt in &candidates {
        match evaluate(&pipes, dt, config) {
            Evaluation::Feasible(grids) => {
                let result = Discretization {
                    global_dt: dt,
                    pipes: grids,
                };
                debug!(
                    dt,
                    nodes = result.total_nodes(),
                    max_adjustment = result.max_celerity_adjustment(),
                    "discretization chosen"
                );
                return Ok(result);
            }
            Evaluation::Infeasible(misfit, pipe) => {
                if closest.is_none_or(|(m, _)| misfit < m) {
                    closest = Some((misfit, pipe));
                }
            }
        }
    }

    let worst_pipe = closest
        .map(|(_, i)| pipes[i].name.to_string())
        .unwrap_or_else(|| pipes[0].name.to_string());
    Err(DiscretizationError::NoFeasibleTimestep {
        dt_cap,
        tolerance: config.celerity_tolerance,
        worst_pipe,
    })
}
