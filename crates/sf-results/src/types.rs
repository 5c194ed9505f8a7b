//! Result data types.

use serde::{Deserialize, Serialize};
use sf_core::{ElementId, NodeRef};
use std::collections::BTreeMap;

pub type RunId = String;

/// Slice of the flat node arrays owned by one pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeLayout {
    pub pipe: ElementId,
    pub name: String,
    /// Index of node 0 in the flat arrays.
    pub offset: usize,
    /// Node count, reaches + 1.
    pub nodes: usize,
}

/// Maps computational nodes to positions in each snapshot's `heads`/`flows`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeLayout {
    pub pipes: Vec<PipeLayout>,
}

impl NodeLayout {
    /// Lay pipes out back to back in the given order.
    pub fn from_pipes(pipes: impl IntoIterator<Item = (ElementId, String, usize)>) -> Self {
        let mut offset = 0;
        let pipes = pipes
            .into_iter()
            .map(|(pipe, name, nodes)| {
                let layout = PipeLayout {
                    pipe,
                    name,
                    offset,
                    nodes,
                };
                offset += nodes;
                layout
            })
            .collect();
        Self { pipes }
    }

    pub fn node_count(&self) -> usize {
        self.pipes.last().map_or(0, |p| p.offset + p.nodes)
    }

    pub fn pipe(&self, id: ElementId) -> Option<&PipeLayout> {
        self.pipes.iter().find(|p| p.pipe == id)
    }

    pub fn pipe_by_name(&self, name: &str) -> Option<&PipeLayout> {
        self.pipes.iter().find(|p| p.name == name)
    }

    /// Flat index of a computational node.
    pub fn index_of(&self, node: NodeRef) -> Option<usize> {
        let p = self.pipe(node.pipe)?;
        let i = node.index as usize;
        (i < p.nodes).then_some(p.offset + i)
    }
}

/// Scalar outputs of one boundary element at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub name: String,
    pub kind: String,
    pub values: BTreeMap<String, f64>,
}

/// Full network state at one recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step: u64,
    pub time_s: f64,
    pub heads: Vec<f64>,
    pub flows: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub time_s: f64,
    pub head_m: f64,
    pub flow_m3s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum RunStatus {
    Completed,
    Aborted { reason: String },
    Cancelled,
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunType {
    Transient {
        duration_s: f64,
        dt_override_s: Option<f64>,
        record_every: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub network_name: String,
    pub timestamp: String,
    pub run_type: RunType,
    pub solver_version: String,
    pub dt_s: f64,
    pub status: RunStatus,
    pub snapshot_count: usize,
    pub layout: NodeLayout,
}
