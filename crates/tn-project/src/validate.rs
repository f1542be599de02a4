//! Snapshot validation logic.

use std::collections::HashSet;

use crate::schema::{SNAPSHOT_VERSION, Snapshot};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_snapshot(snapshot: &Snapshot) -> Result<(), ValidationError> {
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: snapshot.version,
        });
    }
    let topology = &snapshot.topology;

    let mut fluids = HashSet::new();
    for fluid in &topology.fluids {
        if !fluids.insert(fluid.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: fluid.clone(),
                context: "fluids".to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    for component in &topology.components {
        if !names.insert(component.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: component.name.clone(),
                context: "components".to_string(),
            });
        }
    }

    let mut labels = HashSet::new();
    for connection in &topology.connections {
        if !labels.insert(connection.label.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: connection.label.clone(),
                context: "connections".to_string(),
            });
        }
        for endpoint in [&connection.source, &connection.target] {
            if !names.contains(endpoint.component.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: endpoint.component.clone(),
                    context: format!("connection {}", connection.label),
                });
            }
        }
    }

    if !(snapshot.reference.p > 0.0 && snapshot.reference.t > 0.0) {
        return Err(invalid(
            "reference",
            format!("({}, {})", snapshot.reference.p, snapshot.reference.t),
            "reference pressure and temperature must be positive",
        ));
    }

    if snapshot.connections.len() != topology.connections.len() {
        return Err(invalid(
            "connections",
            snapshot.connections.len(),
            "one stream record per connection is required",
        ));
    }
    for (def, stream) in topology.connections.iter().zip(&snapshot.connections) {
        for (var, value) in [("m", stream.m), ("p", stream.p), ("h", stream.h)] {
            if !value.is_finite() {
                return Err(invalid(format!("{}.{var}", def.label), value, "must be finite"));
            }
        }
        for (fluid, fraction) in &stream.fluid {
            if !fluids.contains(fluid.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: fluid.clone(),
                    context: format!("fluid of connection {}", def.label),
                });
            }
            if !(0.0..=1.0).contains(fraction) {
                return Err(invalid(
                    format!("{}.fluid.{fluid}", def.label),
                    fraction,
                    "mass fractions lie in [0, 1]",
                ));
            }
        }
    }

    for record in &snapshot.components {
        if !names.contains(record.name.as_str()) {
            return Err(ValidationError::MissingReference {
                id: record.name.clone(),
                context: "component records".to_string(),
            });
        }
    }

    for bus in &snapshot.busses {
        for member in &bus.members {
            if !names.contains(member.component.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: member.component.clone(),
                    context: format!("bus {}", bus.label),
                });
            }
        }
    }

    Ok(())
}
