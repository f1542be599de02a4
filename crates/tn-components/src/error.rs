//! Error types for component operations.

use thiserror::Error;
use tn_core::CoreError;
use tn_fluids::FluidError;

/// Errors that can occur while configuring or evaluating components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error(transparent)]
    Fluid(#[from] FluidError),

    #[error("{component} has no parameter '{name}'")]
    UnknownParameter { component: String, name: String },

    #[error("{component} has no derived quantity '{name}'")]
    UnknownQuantity { component: String, name: String },

    #[error("{component}: design value of '{name}' is required but missing")]
    MissingDesignValue { component: String, name: String },

    #[error("Setup error: {what}")]
    Setup { what: String },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl ComponentError {
    /// Offending pressure and temperature when the failure is a property-domain error.
    pub fn state(&self) -> Option<(f64, f64)> {
        match self {
            ComponentError::Fluid(err) => err.state(),
            _ => None,
        }
    }
}

impl From<ComponentError> for CoreError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::Fluid(err) => err.into(),
            ComponentError::NonPhysical { what } => CoreError::Invariant { what },
            ComponentError::InvalidArg { what } => CoreError::InvalidArg { what },
            ComponentError::UnknownParameter { .. } | ComponentError::UnknownQuantity { .. } => {
                CoreError::InvalidArg {
                    what: "unknown component attribute",
                }
            }
            ComponentError::MissingDesignValue { .. } => CoreError::Invariant {
                what: "missing design value",
            },
            ComponentError::Setup { .. } => CoreError::InvalidArg {
                what: "component setup",
            },
        }
    }
}
