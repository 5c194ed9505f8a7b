//! Network validation errors.

use crate::network::Port;
use thiserror::Error;

fn port_label(port: &Option<Port>) -> &'static str {
    match port {
        Some(p) => p.as_str(),
        None => "any",
    }
}

/// Structural or parameter problem found in a network definition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Network has no elements")]
    EmptyNetwork,

    #[error("Element name '{name}' is used more than once")]
    DuplicateName { name: String },

    #[error("Element '{element}' has an unconnected port ({})", port_label(.port))]
    DanglingPort { element: String, port: Option<Port> },

    #[error("Element '{element}' port {port} has {count} connections")]
    PortOverloaded {
        element: String,
        port: Port,
        count: usize,
    },

    #[error("Element '{element}' is missing parameter '{field}'")]
    MissingParameter { element: String, field: String },

    #[error("Element '{element}' parameter '{field}' is invalid: {reason}")]
    InvalidParameter {
        element: String,
        field: String,
        reason: String,
    },

    #[error("Element '{element}' has unknown field '{field}'")]
    UnknownField { element: String, field: String },

    #[error("Unknown element '{name}'")]
    UnknownElement { name: String },

    #[error("Invalid connection {from} -> {to}: {reason}")]
    InvalidConnection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Connection {from} -> {to} joins two {port} ports")]
    MismatchedPorts { from: String, to: String, port: Port },

    #[error("Manifolds {elements:?} form a loop without pipe storage")]
    CycleWithoutPipeStorage { elements: Vec<String> },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    /// Name of the element the problem is attached to, if any.
    pub fn element(&self) -> Option<&str> {
        match self {
            ValidationError::DanglingPort { element, .. }
            | ValidationError::PortOverloaded { element, .. }
            | ValidationError::MissingParameter { element, .. }
            | ValidationError::InvalidParameter { element, .. }
            | ValidationError::UnknownField { element, .. } => Some(element),
            ValidationError::DuplicateName { name } | ValidationError::UnknownElement { name } => {
                Some(name)
            }
            ValidationError::InvalidConnection { from, .. }
            | ValidationError::MismatchedPorts { from, .. } => Some(from),
            ValidationError::CycleWithoutPipeStorage { elements } => {
                elements.first().map(String::as_str)
            }
            ValidationError::EmptyNetwork => None,
        }
    }
}
