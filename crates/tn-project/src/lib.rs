//! tn-project: persisted design states and configuration files.
//!
//! A [`Snapshot`] records every stream and component of a converged design
//! solve together with a fingerprint of the network topology, so an
//! off-design run can refuse a snapshot taken from a different network.

pub mod fingerprint;
pub mod schema;
pub mod validate;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use fingerprint::fingerprint;
pub use schema::*;
pub use validate::{ValidationError, validate_snapshot};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Topology fingerprint mismatch: stored {expected}, computed {found}")]
    Fingerprint { expected: String, found: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn checked(snapshot: Snapshot) -> ProjectResult<Snapshot> {
    validate_snapshot(&snapshot)?;
    fingerprint::verify(&snapshot)?;
    Ok(snapshot)
}

pub fn load_yaml(path: &Path) -> ProjectResult<Snapshot> {
    checked(read_yaml(path)?)
}

pub fn save_yaml(path: &Path, snapshot: &Snapshot) -> ProjectResult<()> {
    validate_snapshot(snapshot)?;
    write_yaml(path, snapshot)
}

pub fn load_json(path: &Path) -> ProjectResult<Snapshot> {
    checked(read_json(path)?)
}

pub fn save_json(path: &Path, snapshot: &Snapshot) -> ProjectResult<()> {
    validate_snapshot(snapshot)?;
    write_json(path, snapshot)
}

/// Deserialize any YAML document, e.g. a solver configuration.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> ProjectResult<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> ProjectResult<()> {
    let content = serde_yaml::to_string(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Deserialize any JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ProjectResult<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ProjectResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
