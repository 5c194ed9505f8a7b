//! Append-only result store and the finished simulation result.

use crate::types::{NodeLayout, NodeSample, RunStatus, StepSnapshot};
use crate::{ResultsError, ResultsResult};
use sf_core::{ElementId, NodeRef};

/// Single-writer, append-only collection of step snapshots.
#[derive(Debug, Clone)]
pub struct ResultStore {
    layout: NodeLayout,
    dt_s: f64,
    snapshots: Vec<StepSnapshot>,
}

impl ResultStore {
    pub fn new(layout: NodeLayout, dt_s: f64) -> Self {
        Self {
            layout,
            dt_s,
            snapshots: Vec::new(),
        }
    }

    /// Append a snapshot. Steps and times must strictly increase.
    pub fn push(&mut self, snapshot: StepSnapshot) -> ResultsResult<()> {
        let expected = self.layout.node_count();
        for got in [snapshot.heads.len(), snapshot.flows.len()] {
            if got != expected {
                return Err(ResultsError::LayoutMismatch { expected, got });
            }
        }
        if let Some(last) = self.snapshots.last()
            && (snapshot.step <= last.step || snapshot.time_s <= last.time_s)
        {
            return Err(ResultsError::OutOfOrder {
                step: snapshot.step,
                time_s: snapshot.time_s,
                last_step: last.step,
                last_time_s: last.time_s,
            });
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn last(&self) -> Option<&StepSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Close the store with a final status.
    pub fn finish(self, status: RunStatus) -> SimulationResult {
        SimulationResult {
            layout: self.layout,
            dt_s: self.dt_s,
            snapshots: self.snapshots,
            status,
        }
    }
}

/// Time history of a run, complete or partial.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    layout: NodeLayout,
    dt_s: f64,
    snapshots: Vec<StepSnapshot>,
    status: RunStatus,
}

impl SimulationResult {
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub fn snapshots(&self) -> &[StepSnapshot] {
        &self.snapshots
    }

    pub fn dt_s(&self) -> f64 {
        self.dt_s
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn final_snapshot(&self) -> Option<&StepSnapshot> {
        self.snapshots.last()
    }

    fn flat_index(&self, pipe: ElementId, index: u32) -> ResultsResult<usize> {
        self.layout
            .index_of(NodeRef::new(pipe, index))
            .ok_or_else(|| ResultsError::UnknownNode {
                pipe: self
                    .layout
                    .pipe(pipe)
                    .map_or_else(|| format!("#{pipe}"), |p| p.name.clone()),
                index,
            })
    }

    /// Head and flow history of one computational node.
    pub fn node_series(&self, pipe: ElementId, index: u32) -> ResultsResult<Vec<NodeSample>> {
        let i = self.flat_index(pipe, index)?;
        Ok(self
            .snapshots
            .iter()
            .map(|s| NodeSample {
                time_s: s.time_s,
                head_m: s.heads[i],
                flow_m3s: s.flows[i],
            })
            .collect())
    }

    /// `(time, value)` history of one element output, e.g. a valve's `"opening"`.
    pub fn element_series(&self, name: &str, field: &str) -> Vec<(f64, f64)> {
        self.snapshots
            .iter()
            .filter_map(|s| {
                s.elements
                    .iter()
                    .find(|e| e.name == name)
                    .and_then(|e| e.values.get(field))
                    .map(|&v| (s.time_s, v))
            })
            .collect()
    }

    /// Highest recorded head at a node.
    pub fn max_head(&self, pipe: ElementId, index: u32) -> ResultsResult<Option<f64>> {
        let i = self.flat_index(pipe, index)?;
        Ok(self.snapshots.iter().map(|s| s.heads[i]).reduce(f64::max))
    }

    /// Lowest recorded head at a node.
    pub fn min_head(&self, pipe: ElementId, index: u32) -> ResultsResult<Option<f64>> {
        let i = self.flat_index(pipe, index)?;
        Ok(self.snapshots.iter().map(|s| s.heads[i]).reduce(f64::min))
    }
}
