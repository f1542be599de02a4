//! Error types for solver operations.

use thiserror::Error;
use tn_components::ComponentError;
use tn_core::CoreError;
use tn_project::ProjectError;

/// Errors that can occur while setting up or solving a network.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Under-determined system: {unknowns} unknowns but only {equations} equations")]
    UnderDetermined { unknowns: usize, equations: usize },

    #[error("Over-determined system: {equations} equations for only {unknowns} unknowns")]
    OverDetermined { unknowns: usize, equations: usize },

    #[error("Singular Jacobian: {what}")]
    SingularJacobian { what: String },

    #[error("No convergence after {iterations} iterations, max |residual| = {residual:e}")]
    NonConvergence { iterations: usize, residual: f64 },

    #[error("Newton iteration stalled after {iterations} iterations, max |residual| = {residual:e}")]
    Stagnation { iterations: usize, residual: f64 },

    #[error("Property evaluation failed in {location}: {source}")]
    PropertyEvaluation {
        location: String,
        #[source]
        source: ComponentError,
    },

    #[error("Off-design solve requires a design state: {what}")]
    MissingDesignState { what: String },

    #[error("Snapshot topology {found} does not match network topology {expected}")]
    TopologyMismatch { expected: String, found: String },

    #[error("No converged solution available: {what}")]
    NotSolved { what: &'static str },

    #[error("Network setup error: {what}")]
    Setup { what: String },

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    /// Classify a component failure raised while evaluating `location`.
    ///
    /// Property-domain failures become [`SolverError::PropertyEvaluation`] so
    /// the offending state stays attached; everything else passes through.
    pub(crate) fn during(location: impl Into<String>, err: ComponentError) -> Self {
        match err {
            ComponentError::Fluid(_) => SolverError::PropertyEvaluation {
                location: location.into(),
                source: err,
            },
            other => SolverError::Component(other),
        }
    }

    /// Offending (p, T) of a property failure, when known.
    pub fn state(&self) -> Option<(f64, f64)> {
        match self {
            SolverError::PropertyEvaluation { source, .. } => source.state(),
            _ => None,
        }
    }
}

impl From<SolverError> for CoreError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::UnderDetermined { .. } | SolverError::OverDetermined { .. } => {
                CoreError::InvalidArg {
                    what: "degrees of freedom",
                }
            }
            SolverError::SingularJacobian { .. } => CoreError::Invariant {
                what: "singular Jacobian",
            },
            SolverError::NonConvergence { .. } | SolverError::Stagnation { .. } => {
                CoreError::Invariant {
                    what: "convergence",
                }
            }
            SolverError::PropertyEvaluation { source, .. } => source.into(),
            SolverError::MissingDesignState { .. } | SolverError::TopologyMismatch { .. } => {
                CoreError::InvalidArg {
                    what: "design state",
                }
            }
            SolverError::NotSolved { what } => CoreError::Invariant { what },
            SolverError::Setup { .. } => CoreError::InvalidArg {
                what: "network setup",
            },
            SolverError::Component(err) => err.into(),
            SolverError::Project(_) => CoreError::InvalidArg { what: "project" },
        }
    }
}
