use std::collections::BTreeMap;

use tn_project::schema::*;
use tn_project::{
    ProjectError, ValidationError, load_json, load_yaml, save_json, save_yaml, validate_snapshot,
};

fn endpoint(component: &str, port: &str) -> EndpointDef {
    EndpointDef {
        component: component.to_string(),
        port: port.to_string(),
    }
}

fn heater_snapshot() -> Snapshot {
    let topology = TopologyDef {
        fluids: vec!["H2O".to_string()],
        components: vec![
            ComponentDef {
                name: "feed".to_string(),
                kind: "source".to_string(),
            },
            ComponentDef {
                name: "heater".to_string(),
                kind: "heat exchanger simple".to_string(),
            },
            ComponentDef {
                name: "drain".to_string(),
                kind: "sink".to_string(),
            },
        ],
        connections: vec![
            ConnectionDef {
                label: "c1".to_string(),
                source: endpoint("feed", "out1"),
                target: endpoint("heater", "in1"),
            },
            ConnectionDef {
                label: "c2".to_string(),
                source: endpoint("heater", "out1"),
                target: endpoint("drain", "in1"),
            },
        ],
    };
    let water = BTreeMap::from([("H2O".to_string(), 1.0)]);
    Snapshot::new(
        topology,
        ReferenceDef {
            p: 1e5,
            t: 298.15,
        },
        vec![
            StreamRecord {
                m: 2.5,
                p: 5e5,
                h: 105_000.3,
                t: Some(323.15),
                fluid: water.clone(),
            },
            StreamRecord {
                m: 2.5,
                p: 4.5e5,
                h: 272_511.9,
                t: None,
                fluid: water,
            },
        ],
        vec![ComponentRecord {
            name: "heater".to_string(),
            parameters: BTreeMap::from([("pr".to_string(), 0.9)]),
            design: BTreeMap::from([("Q".to_string(), 418_779.0), ("zeta".to_string(), 3.1e9)]),
        }],
        vec![BusRecord {
            label: "heat input".to_string(),
            target: Some(418_779.0),
            value: 418_779.0,
            members: vec![BusMemberDef {
                component: "heater".to_string(),
                quantity: "Q".to_string(),
            }],
        }],
    )
    .unwrap()
}

#[test]
fn new_snapshot_is_stamped() {
    let snapshot = heater_snapshot();
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.fingerprint.len(), 64);
    assert!(chrono::DateTime::parse_from_rfc3339(&snapshot.created_at).is_ok());
    validate_snapshot(&snapshot).unwrap();
}

#[test]
fn roundtrip_yaml() {
    let snapshot = heater_snapshot();
    let path = std::env::temp_dir().join("tn_project_roundtrip.yaml");

    save_yaml(&path, &snapshot).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(snapshot, loaded);
    assert_eq!(loaded.connection("c2").map(|s| s.p), Some(4.5e5));
    assert_eq!(loaded.component("heater").map(|c| c.design["Q"]), Some(418_779.0));
}

#[test]
fn roundtrip_json() {
    let snapshot = heater_snapshot();
    let path = std::env::temp_dir().join("tn_project_roundtrip.json");

    save_json(&path, &snapshot).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(snapshot, loaded);
}

#[test]
fn edited_topology_fails_the_fingerprint_check() {
    let mut snapshot = heater_snapshot();
    snapshot.topology.components[1].kind = "valve".to_string();
    let path = std::env::temp_dir().join("tn_project_tampered.json");

    save_json(&path, &snapshot).unwrap();
    let err = load_json(&path).unwrap_err();

    assert!(matches!(err, ProjectError::Fingerprint { .. }), "{err}");
}

#[test]
fn dangling_endpoint_is_rejected() {
    let mut snapshot = heater_snapshot();
    snapshot.topology.connections[1].target.component = "stack".to_string();

    let err = validate_snapshot(&snapshot).unwrap_err();
    assert!(matches!(err, ValidationError::MissingReference { ref id, .. } if id == "stack"));
}

#[test]
fn stream_records_must_match_connections() {
    let mut snapshot = heater_snapshot();
    snapshot.connections.pop();
    assert!(matches!(
        validate_snapshot(&snapshot),
        Err(ValidationError::InvalidValue { .. })
    ));

    let mut snapshot = heater_snapshot();
    snapshot.connections[0].fluid.insert("H2O".to_string(), 1.5);
    assert!(validate_snapshot(&snapshot).is_err());
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("tn_project_does_not_exist.yaml");
    assert!(matches!(load_yaml(&path), Err(ProjectError::Io(_))));
}
