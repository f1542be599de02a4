//! Solver-wide configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SolverResult;
use crate::newton::NewtonConfig;

/// Settings shared by every solve of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Convergence threshold on the largest absolute residual
    pub tolerance: f64,
    /// Newton iteration cap
    pub max_iterations: usize,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Minimum allowed pressure (Pa)
    pub min_pressure: f64,
    /// Relative finite-difference step
    pub fd_step: f64,
    /// Pre-evaluate stream temperatures in parallel before each residual pass
    pub parallel_properties: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 50,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
            min_pressure: 1.0,
            fd_step: 1e-7,
            parallel_properties: false,
        }
    }
}

impl SolverConfig {
    pub fn from_yaml(path: &Path) -> SolverResult<Self> {
        Ok(tn_project::read_yaml(path)?)
    }

    pub fn from_json(path: &Path) -> SolverResult<Self> {
        Ok(tn_project::read_json(path)?)
    }

    pub(crate) fn newton(&self) -> NewtonConfig {
        NewtonConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            line_search_beta: self.line_search_beta,
            max_line_search_iters: self.max_line_search_iters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let path = std::env::temp_dir().join("tn_solver_partial_config.yaml");
        std::fs::write(&path, "tolerance: 1.0e-8\nparallel_properties: true\n").unwrap();

        let config = SolverConfig::from_yaml(&path).unwrap();
        assert_eq!(config.tolerance, 1e-8);
        assert!(config.parallel_properties);
        assert_eq!(config.max_iterations, SolverConfig::default().max_iterations);
    }

    #[test]
    fn json_round_trip() {
        let config = SolverConfig {
            max_iterations: 80,
            fd_step: 1e-6,
            ..SolverConfig::default()
        };
        let path = std::env::temp_dir().join("tn_solver_config.json");
        tn_project::write_json(&path, &config).unwrap();
        assert_eq!(SolverConfig::from_json(&path).unwrap(), config);
    }
}
