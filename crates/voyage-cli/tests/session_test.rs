//! Session tests against a real save file in a temporary directory.

use std::path::Path;
use voyage_cli::{store, Config, Session, TerrainPreset};
use voyage_core::{ControllerKind, GeoPoint, TerrainMask, VesselState};

fn config(save_path: &Path, terrain: TerrainPreset) -> Config {
    Config {
        cell_size_deg: 2.0,
        terrain,
        save_path: save_path.to_path_buf(),
        tick_seconds: 300.0,
        // the sun never moves, so the prime meridian stays lit
        day_length_s: f64::INFINITY,
        ..Config::default()
    }
}

#[test]
fn fleet_survives_sessions_and_reaches_its_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.json");

    let mut session = Session::open(config(&path, TerrainPreset::Land)).unwrap();
    session
        .add_vehicle("rover-1", ControllerKind::Rover, GeoPoint::new(0.0, 0.0), Some(200.0))
        .unwrap();
    let distance = session.plan_route("rover-1", GeoPoint::new(0.0, 8.0)).unwrap();
    assert!(distance > 880_000.0);
    session.activate("rover-1").unwrap();
    session.control(Some("rover-1")).unwrap();
    session.persist().unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("pathEncoded"));
    assert!(json.contains("saved_at"));

    let mut session = Session::open(config(&path, TerrainPreset::Land)).unwrap();
    let statuses = session.statuses();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].state, VesselState::Current);
    assert!(session.fleet.get("rover-1").unwrap().autopilot.is_active());

    let reports = session.run(7.0 * 86_400.0);
    assert!(reports.iter().any(|r| r.arrived == vec!["rover-1".to_string()]));
    session.persist().unwrap();

    let session = Session::open(config(&path, TerrainPreset::Land)).unwrap();
    let vehicle = session.fleet.get("rover-1").unwrap();
    assert!(!vehicle.autopilot.is_active());
    assert_eq!(vehicle.autopilot.remaining_distance_to_target(), 0.0);
    assert!(vehicle.parked_at.distance_to(&GeoPoint::new(0.0, 8.0), 6_371_000.0) < 1.0);
    assert!(session.driver.now() > 0.0);
}

#[test]
fn ships_cannot_be_routed_inland() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.json");

    let mut session = Session::open(config(&path, TerrainPreset::Strait)).unwrap();
    session
        .add_vehicle("ship-1", ControllerKind::Ship, GeoPoint::new(-30.0, 15.0), None)
        .unwrap();
    assert!(session.plan_route("ship-1", GeoPoint::new(0.0, 60.0)).is_err());
    assert!(session.activate("ship-1").is_err());
    assert!(session.plan_route("ship-1", GeoPoint::new(30.0, 15.0)).is_ok());
    session.activate("ship-1").unwrap();
}

#[test]
fn stateless_plan_prints_an_encoded_route() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::open(config(&dir.path().join("unused.json"), TerrainPreset::Strait)).unwrap();

    let (result, encoded) = session
        .plan(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 30.0), TerrainMask::LAND_OR_OCEAN)
        .unwrap();
    let decoded = voyage_core::decode(&encoded).unwrap();
    assert_eq!(decoded.len(), result.route.len());
    assert!(!dir.path().join("unused.json").exists());
}

#[test]
fn corrupt_save_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(store::load(&path), Err(voyage_cli::StoreError::Json(_))));
    assert!(Session::open(config(&path, TerrainPreset::Land)).is_err());
}
