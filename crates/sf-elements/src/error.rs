//! Error types for element parameters and boundary solves.

use sf_controls::ControlError;
use thiserror::Error;

/// Errors raised while solving a boundary element for one time step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundaryConditionError {
    #[error("Boundary '{element}' has no solution: {reason}")]
    Unsolvable { element: String, reason: String },

    #[error("Non-physical value at '{element}': {what}")]
    NonPhysical { element: String, what: &'static str },

    #[error("Control law error: {0}")]
    Control(#[from] ControlError),
}

pub type BcResult<T> = Result<T, BoundaryConditionError>;

/// A single problem with an element's parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// Required value is unset (zero or non-finite).
    #[error("missing parameter '{field}'")]
    Missing { field: &'static str },

    #[error("invalid parameter '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ParameterError {
    pub fn field(&self) -> &'static str {
        match self {
            ParameterError::Missing { field } | ParameterError::Invalid { field, .. } => field,
        }
    }
}

/// Element class name that does not match any known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown element class '{0}'")]
pub struct UnknownKind(pub String);

/// Turbine runner name outside the supported families.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown turbine runner '{0}'")]
pub struct UnknownRunner(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BoundaryConditionError::Unsolvable {
            element: "V1".into(),
            reason: "zero loss coefficient".into(),
        };
        assert!(err.to_string().contains("V1"));
        assert!(err.to_string().contains("zero loss"));
    }

    #[test]
    fn parameter_field_name() {
        assert_eq!(ParameterError::Missing { field: "diameter" }.field(), "diameter");
    }
}
