//! Design-state snapshot schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Re-loadable record of a converged design solve.
///
/// `connections` and `components` are aligned with the entries of
/// `topology`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    /// RFC 3339 creation time
    pub created_at: String,
    /// Hex SHA-256 of `topology`
    pub fingerprint: String,
    pub topology: TopologyDef,
    pub reference: ReferenceDef,
    #[serde(default)]
    pub connections: Vec<StreamRecord>,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
    #[serde(default)]
    pub busses: Vec<BusRecord>,
}

/// Structure of a network: fluids, components and how they are connected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TopologyDef {
    pub fluids: Vec<String>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub label: String,
    pub source: EndpointDef,
    pub target: EndpointDef,
}

/// A component port, e.g. `{ component: "boiler", port: "out1" }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointDef {
    pub component: String,
    pub port: String,
}

/// Enthalpy and entropy datum the stream values refer to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceDef {
    /// Pressure [Pa]
    pub p: f64,
    /// Temperature [K]
    pub t: f64,
}

/// Solved values of one stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamRecord {
    /// Mass flow [kg/s]
    pub m: f64,
    /// Pressure [Pa]
    pub p: f64,
    /// Specific enthalpy [J/kg]
    pub h: f64,
    /// Temperature [K], when it could be evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<f64>,
    /// Mass fraction per species key
    pub fluid: BTreeMap<String, f64>,
}

/// Parameters and design point of one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentRecord {
    pub name: String,
    /// Fixed parameter values at the time of the solve
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    /// Derived quantities of the converged solve
    #[serde(default)]
    pub design: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusRecord {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    pub value: f64,
    #[serde(default)]
    pub members: Vec<BusMemberDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusMemberDef {
    pub component: String,
    pub quantity: String,
}

impl Snapshot {
    /// Stamp a new snapshot with the current time and the topology fingerprint.
    pub fn new(
        topology: TopologyDef,
        reference: ReferenceDef,
        connections: Vec<StreamRecord>,
        components: Vec<ComponentRecord>,
        busses: Vec<BusRecord>,
    ) -> crate::ProjectResult<Self> {
        let fingerprint = crate::fingerprint::fingerprint(&topology)?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            fingerprint,
            topology,
            reference,
            connections,
            components,
            busses,
        })
    }

    pub fn component(&self, name: &str) -> Option<&ComponentRecord> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn connection(&self, label: &str) -> Option<&StreamRecord> {
        self.topology
            .connections
            .iter()
            .position(|c| c.label == label)
            .and_then(|i| self.connections.get(i))
    }
}
