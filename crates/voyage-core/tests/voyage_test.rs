//! End-to-end tests: plan a route on a classified grid, persist it, reload
//! it and drive it to the end.

use voyage_core::{
    decode, encode, find_path, Autopilot, GeoPoint, GridConfig, GridModel, PowerConditions,
    RouteError, RoverProfile, ShipProfile, TerrainMask, TerrainType, TickOutcome, VesselState,
};

fn config(cell_size_deg: f64) -> GridConfig {
    GridConfig {
        cell_size_deg,
        ..GridConfig::default()
    }
}

/// Land everywhere except an ocean strait between 10°E and 20°E that stops
/// short of the polar caps.
fn strait_world() -> GridModel {
    GridModel::from_fn(config(5.0), |center| {
        if (10.0..=20.0).contains(&center.lon()) && center.lat().abs() < 60.0 {
            TerrainType::Ocean
        } else {
            TerrainType::Land
        }
    })
    .unwrap()
}

/// A land pocket around the prime meridian walled in by impassable terrain.
fn walled_world() -> GridModel {
    GridModel::from_fn(config(5.0), |center| {
        let lon = center.lon();
        if (10.0..=20.0).contains(&lon) || (-20.0..=-10.0).contains(&lon) || center.lat().abs() > 70.0
        {
            TerrainType::Impassable
        } else {
            TerrainType::Land
        }
    })
    .unwrap()
}

#[test]
fn repeated_searches_encode_identically() {
    let grid = strait_world();
    let origin = GeoPoint::new(-12.0, -40.0);
    let destination = GeoPoint::new(33.0, 75.0);

    let first = find_path(&origin, &destination, &grid, TerrainMask::LAND_OR_OCEAN).unwrap();
    let second = find_path(&origin, &destination, &grid, TerrainMask::LAND_OR_OCEAN).unwrap();
    assert_eq!(encode(&first.route), encode(&second.route));
    assert_eq!(first.tiles, second.tiles);
}

#[test]
fn land_routes_never_touch_water() {
    let grid = strait_world();
    let result = find_path(
        &GeoPoint::new(0.0, 0.0),
        &GeoPoint::new(0.0, 30.0),
        &grid,
        TerrainMask::LAND,
    )
    .unwrap();

    for tile in &result.tiles {
        assert_eq!(tile.terrain, TerrainType::Land, "route crosses {}", tile.index);
    }

    let with_water = find_path(
        &GeoPoint::new(0.0, 0.0),
        &GeoPoint::new(0.0, 30.0),
        &grid,
        TerrainMask::LAND_OR_OCEAN,
    )
    .unwrap();
    assert!(with_water.distance_m() < result.distance_m());
}

#[test]
fn walled_in_vehicle_gets_no_route_and_keeps_its_state() {
    let grid = walled_world();
    let outcome = find_path(
        &GeoPoint::new(0.0, 0.0),
        &GeoPoint::new(0.0, 40.0),
        &grid,
        TerrainMask::LAND_OR_OCEAN,
    );
    assert!(matches!(outcome, Err(RouteError::NoPathFound { .. })));

    let mut autopilot = Autopilot::new("rover-walled", Box::new(RoverProfile::default()));
    let before = autopilot.save();
    assert!(!autopilot.find_route(&grid, &GeoPoint::new(0.0, 0.0), 0.0, 40.0));
    assert_eq!(autopilot.save(), before);
    assert_eq!(autopilot.remaining_distance_to_target(), 0.0);
}

#[test]
fn ship_plans_through_the_strait() {
    let grid = strait_world();
    let mut autopilot = Autopilot::new("ship-1", Box::new(ShipProfile::default()));
    assert!(autopilot.find_route(&grid, &GeoPoint::new(-40.0, 15.0), 40.0, 15.0));
    assert!(!autopilot.find_route(&grid, &GeoPoint::new(-40.0, 15.0), 0.0, 90.0));
}

#[test]
fn stored_route_decodes_close_to_the_original() {
    let grid = strait_world();
    let result = find_path(
        &GeoPoint::new(5.123_45, -3.5),
        &GeoPoint::new(-7.25, 42.0),
        &grid,
        TerrainMask::LAND,
    )
    .unwrap();

    let decoded = decode(&encode(&result.route)).unwrap();
    assert_eq!(decoded.len(), result.route.len());
    for (a, b) in result.route.waypoints().iter().zip(decoded.waypoints()) {
        assert!((a.lat() - b.lat()).abs() < 1e-4, "{a} vs {b}");
        assert!((a.lon() - b.lon()).abs() < 1e-4, "{a} vs {b}");
    }
}

#[test]
fn route_survives_json_round_trip() {
    let grid = strait_world();
    let result = find_path(
        &GeoPoint::new(0.0, 0.0),
        &GeoPoint::new(10.0, -10.0),
        &grid,
        TerrainMask::LAND,
    )
    .unwrap();

    let json = serde_json::to_string(&result.route).unwrap();
    let parsed: voyage_core::Route = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, result.route);
}

#[test]
fn rover_lifecycle_across_a_save() {
    let grid = strait_world();
    let profile = || {
        Box::new(RoverProfile {
            average_speed_mps: 250.0,
            ..RoverProfile::default()
        })
    };

    let mut autopilot = Autopilot::new("rover-1", profile());
    assert!(autopilot.find_route(&grid, &GeoPoint::new(0.0, -30.0), 0.0, -20.0));
    assert!(autopilot.activate());
    assert_eq!(autopilot.stored_state(), VesselState::Moving);

    autopilot.advance(100.0, &PowerConditions::sunlit(45.0));
    autopilot.advance(400.0, &PowerConditions::sunlit(45.0));
    let travelled = autopilot.travel_state().distance_travelled;
    assert_eq!(travelled, 75_000.0);

    let node = autopilot.save();
    let (mut resumed, warnings) = Autopilot::load("rover-1", profile(), &node);
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(resumed.travel_state().distance_travelled, travelled);
    assert_eq!(resumed.stored_state(), VesselState::Moving);

    let mut now = 400.0;
    let mut outcome = TickOutcome::Idle;
    for _ in 0..1_000 {
        now += 600.0;
        outcome = resumed.advance(now, &PowerConditions::sunlit(45.0));
        if outcome == TickOutcome::Arrived {
            break;
        }
    }
    assert_eq!(outcome, TickOutcome::Arrived);
    assert_eq!(resumed.remaining_distance_to_target(), 0.0);
    assert!(!resumed.is_active());
}
