//! Fluid property errors.

use thiserror::Error;
use tn_core::CoreError;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors that can occur during fluid property calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-physical values (negative density, pressure, etc.).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// State outside the valid domain of the property correlations.
    #[error("{what} outside valid property domain at p = {p} Pa, T = {t} K")]
    OutOfDomain { what: &'static str, p: f64, t: f64 },

    /// Invalid argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Operation not supported by the active property source.
    #[error("Not supported: {what}")]
    NotSupported { what: String },

    /// Backend (CoolProp) error.
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// Convergence failure (e.g., solving for T given P,h).
    #[error("Convergence failed for {what} at p = {p} Pa")]
    ConvergenceFailed { what: &'static str, p: f64 },
}

impl FluidError {
    /// Pressure and temperature of the failing state, when known.
    pub fn state(&self) -> Option<(f64, f64)> {
        match self {
            FluidError::OutOfDomain { p, t, .. } => Some((*p, *t)),
            _ => None,
        }
    }
}

impl From<FluidError> for CoreError {
    fn from(err: FluidError) -> Self {
        match err {
            FluidError::NonPhysical { what } => CoreError::Invariant { what },
            FluidError::OutOfDomain { what, .. } => CoreError::InvalidArg { what },
            FluidError::InvalidArg { what } => CoreError::InvalidArg { what },
            FluidError::NotSupported { .. } => CoreError::Invariant {
                what: "fluid operation not supported",
            },
            FluidError::Backend { .. } => CoreError::Invariant {
                what: "fluid backend error",
            },
            FluidError::ConvergenceFailed { what, .. } => CoreError::Invariant { what },
        }
    }
}
