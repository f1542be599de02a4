//! Content hash identifying a network topology.

use sha2::{Digest, Sha256};

use crate::ProjectResult;
use crate::schema::{Snapshot, TopologyDef};

/// Hex SHA-256 of the canonical JSON form of `topology`.
///
/// Stream values, parameters and busses do not contribute: two networks share
/// a fingerprint exactly when their fluids, components and connections match.
pub fn fingerprint(topology: &TopologyDef) -> ProjectResult<String> {
    let mut hasher = Sha256::new();
    let json = serde_json::to_string(topology)?;
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fail unless the stored fingerprint matches the snapshot's topology.
pub fn verify(snapshot: &Snapshot) -> ProjectResult<()> {
    let found = fingerprint(&snapshot.topology)?;
    if found != snapshot.fingerprint {
        return Err(crate::ProjectError::Fingerprint {
            expected: snapshot.fingerprint.clone(),
            found,
        });
    }
    Ok(())
}
