//! Structured results of a converged solve.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamReport {
    pub label: String,
    pub m: f64,
    pub p: f64,
    pub h: f64,
    pub t: f64,
    /// Mass fractions of the species present
    pub fluid: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentReport {
    pub name: String,
    pub kind: String,
    pub derived: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusReport {
    pub label: String,
    pub target: Option<f64>,
    pub value: f64,
}

/// Everything a user reads after a solve, ready for `serde_json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkReport {
    pub mode: String,
    pub iterations: usize,
    /// Max |residual| before every Newton step, then at the solution
    pub residual_history: Vec<f64>,
    pub connections: Vec<StreamReport>,
    pub components: Vec<ComponentReport>,
    pub busses: Vec<BusReport>,
}

impl NetworkReport {
    pub fn connection(&self, label: &str) -> Option<&StreamReport> {
        self.connections.iter().find(|c| c.label == label)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentReport> {
        self.components.iter().find(|c| c.name == name)
    }
}
