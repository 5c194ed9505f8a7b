//! Document schema: elements with free-form fields plus named connections.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Absent in the editor's raw dumps, which are version 0.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

/// One element as saved by the editor.
///
/// Everything beyond `class`, `name` and the canvas position is kept as raw
/// JSON values; typing happens in [`crate::to_network`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDef {
    pub class: String,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortDef {
    Inlet,
    Outlet,
}

fn default_from_port() -> PortDef {
    PortDef::Outlet
}

fn default_to_port() -> PortDef {
    PortDef::Inlet
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
    #[serde(default = "default_from_port")]
    pub from_port: PortDef,
    #[serde(default = "default_to_port")]
    pub to_port: PortDef,
}

impl ConnectionDef {
    /// `from.outlet -> to.inlet`.
    pub fn downstream(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_port: PortDef::Outlet,
            to_port: PortDef::Inlet,
        }
    }
}

impl Document {
    pub fn element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }
}
