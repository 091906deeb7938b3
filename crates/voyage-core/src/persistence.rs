//! Flat key/value persistence of autopilot travel state.
//!
//! Each vehicle is stored as a node of string fields. Loading never fails:
//! missing keys take their defaults, unreadable values take their defaults
//! and are reported, and a malformed route is dropped.

use crate::autopilot::{Autopilot, TravelState};
use crate::codec;
use crate::profile::VehicleProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Persisted fields of one vehicle.
pub type ConfigNode = BTreeMap<String, String>;

pub const KEY_ACTIVE: &str = "active";
pub const KEY_SHUTDOWN: &str = "shutdown";
pub const KEY_TARGET_LATITUDE: &str = "targetLatitude";
pub const KEY_TARGET_LONGITUDE: &str = "targetLongitude";
pub const KEY_DISTANCE_TO_TARGET: &str = "distanceToTarget";
pub const KEY_DISTANCE_TRAVELLED: &str = "distanceTravelled";
pub const KEY_LAST_TIME_UPDATED: &str = "lastTimeUpdated";
pub const KEY_PATH_ENCODED: &str = "pathEncoded";

/// A field that could not be read and fell back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadWarning {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl LoadWarning {
    fn new(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}: {}", self.key, self.value, self.reason)
    }
}

/// Write travel state as string fields. Numbers use their shortest exact
/// form so a load reproduces them bit for bit.
pub fn save_travel_state(travel: &TravelState) -> ConfigNode {
    let mut node = ConfigNode::new();
    node.insert(KEY_ACTIVE.into(), travel.active.to_string());
    node.insert(KEY_SHUTDOWN.into(), travel.shutdown.to_string());
    node.insert(KEY_TARGET_LATITUDE.into(), travel.target_latitude.to_string());
    node.insert(KEY_TARGET_LONGITUDE.into(), travel.target_longitude.to_string());
    node.insert(KEY_DISTANCE_TO_TARGET.into(), travel.distance_to_target.to_string());
    node.insert(KEY_DISTANCE_TRAVELLED.into(), travel.distance_travelled.to_string());
    node.insert(KEY_LAST_TIME_UPDATED.into(), travel.last_time_updated.to_string());
    node.insert(
        KEY_PATH_ENCODED.into(),
        travel.route.as_ref().map(codec::encode).unwrap_or_default(),
    );
    node
}

/// Read travel state back. The returned state always satisfies
/// `0 <= distance_travelled <= distance_to_target`.
pub fn load_travel_state(node: &ConfigNode) -> (TravelState, Vec<LoadWarning>) {
    let mut warnings = Vec::new();

    let mut travel = TravelState {
        active: read_bool(node, KEY_ACTIVE, &mut warnings),
        shutdown: read_bool(node, KEY_SHUTDOWN, &mut warnings),
        target_latitude: read_f64(node, KEY_TARGET_LATITUDE, &mut warnings),
        target_longitude: read_f64(node, KEY_TARGET_LONGITUDE, &mut warnings),
        distance_to_target: read_f64(node, KEY_DISTANCE_TO_TARGET, &mut warnings),
        distance_travelled: read_f64(node, KEY_DISTANCE_TRAVELLED, &mut warnings),
        last_time_updated: read_f64(node, KEY_LAST_TIME_UPDATED, &mut warnings),
        route: None,
    };

    if let Some(encoded) = node.get(KEY_PATH_ENCODED).filter(|value| !value.trim().is_empty()) {
        match codec::decode(encoded) {
            Ok(route) => travel.route = Some(route),
            Err(err) => warnings.push(LoadWarning::new(KEY_PATH_ENCODED, encoded, err.to_string())),
        }
    }

    if travel.distance_to_target < 0.0 {
        warnings.push(LoadWarning::new(
            KEY_DISTANCE_TO_TARGET,
            &travel.distance_to_target.to_string(),
            "negative distance, reset to 0",
        ));
        travel.distance_to_target = 0.0;
    }
    if travel.distance_travelled < 0.0 || travel.distance_travelled > travel.distance_to_target {
        let clamped = travel.distance_travelled.clamp(0.0, travel.distance_to_target);
        warnings.push(LoadWarning::new(
            KEY_DISTANCE_TRAVELLED,
            &travel.distance_travelled.to_string(),
            format!("outside 0..={}, clamped to {clamped}", travel.distance_to_target),
        ));
        travel.distance_travelled = clamped;
    }
    if travel.active && travel.route.is_none() {
        warnings.push(LoadWarning::new(
            KEY_ACTIVE,
            "true",
            "active without a readable route, deactivated",
        ));
        travel.active = false;
    }

    for warning in &warnings {
        tracing::warn!(
            key = %warning.key,
            value = %warning.value,
            reason = %warning.reason,
            "recovered from unreadable persisted field"
        );
    }

    (travel, warnings)
}

impl Autopilot {
    pub fn save(&self) -> ConfigNode {
        save_travel_state(self.travel_state())
    }

    /// Rebuild an autopilot from a persisted node.
    pub fn load(
        vehicle_id: impl Into<String>,
        profile: Box<dyn VehicleProfile>,
        node: &ConfigNode,
    ) -> (Self, Vec<LoadWarning>) {
        let (travel, warnings) = load_travel_state(node);
        (Self::with_travel_state(vehicle_id, profile, travel), warnings)
    }
}

fn read_bool(node: &ConfigNode, key: &str, warnings: &mut Vec<LoadWarning>) -> bool {
    let Some(raw) = node.get(key) else {
        return false;
    };
    let value = raw.trim();
    if value.eq_ignore_ascii_case("true") {
        true
    } else if value.eq_ignore_ascii_case("false") || value.is_empty() {
        false
    } else {
        warnings.push(LoadWarning::new(key, raw, "not a boolean, using false"));
        false
    }
}

fn read_f64(node: &ConfigNode, key: &str, warnings: &mut Vec<LoadWarning>) -> f64 {
    let Some(raw) = node.get(key) else {
        return 0.0;
    };
    let value = raw.trim();
    if value.is_empty() {
        return 0.0;
    }
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => parsed,
        _ => {
            warnings.push(LoadWarning::new(key, raw, "not a finite number, using 0"));
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoPoint, EARTH_RADIUS_M};
    use crate::models::{Route, VesselState};
    use crate::profile::RoverProfile;

    fn travelling() -> TravelState {
        TravelState {
            target_latitude: 1.25,
            target_longitude: -33.5,
            distance_to_target: 4_000.125,
            distance_travelled: 1_000.5,
            last_time_updated: 86_400.25,
            active: true,
            shutdown: false,
            route: Some(Route::from_waypoints(
                vec![GeoPoint::new(1.0, -33.0), GeoPoint::new(1.25, -33.5)],
                EARTH_RADIUS_M,
            )),
        }
    }

    #[test]
    fn save_then_load_restores_fields() {
        let original = travelling();
        let node = save_travel_state(&original);
        assert_eq!(node[KEY_ACTIVE], "true");
        assert!(node[KEY_PATH_ENCODED].contains(':'));

        let (loaded, warnings) = load_travel_state(&node);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(loaded.active, original.active);
        assert_eq!(loaded.target_latitude, original.target_latitude);
        assert_eq!(loaded.distance_travelled, original.distance_travelled);
        assert_eq!(loaded.last_time_updated, original.last_time_updated);
        assert_eq!(loaded.route.map(|route| route.len()), Some(2));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let (loaded, warnings) = load_travel_state(&ConfigNode::new());
        assert!(warnings.is_empty());
        assert_eq!(loaded, TravelState::default());
    }

    #[test]
    fn bools_are_case_insensitive() {
        let mut node = save_travel_state(&travelling());
        node.insert(KEY_ACTIVE.into(), "True".into());
        node.insert(KEY_SHUTDOWN.into(), "FALSE".into());
        let (loaded, warnings) = load_travel_state(&node);
        assert!(warnings.is_empty());
        assert!(loaded.active);
        assert!(!loaded.shutdown);
    }

    #[test]
    fn garbled_values_fall_back_and_warn() {
        let mut node = save_travel_state(&travelling());
        node.insert(KEY_TARGET_LATITUDE.into(), "north-ish".into());
        node.insert(KEY_SHUTDOWN.into(), "maybe".into());
        let (loaded, warnings) = load_travel_state(&node);

        assert_eq!(loaded.target_latitude, 0.0);
        assert!(!loaded.shutdown);
        let keys: Vec<&str> = warnings.iter().map(|w| w.key.as_str()).collect();
        assert_eq!(keys, vec![KEY_SHUTDOWN, KEY_TARGET_LATITUDE]);
    }

    #[test]
    fn malformed_path_loads_as_no_route() {
        let mut node = save_travel_state(&travelling());
        node.insert(KEY_PATH_ENCODED.into(), "12.0:not a polyline".into());
        let (loaded, warnings) = load_travel_state(&node);

        assert!(loaded.route.is_none());
        assert!(!loaded.active);
        assert!(warnings.iter().any(|w| w.key == KEY_PATH_ENCODED));
        assert!(warnings.iter().any(|w| w.key == KEY_ACTIVE));
    }

    #[test]
    fn distance_invariant_is_restored() {
        let mut node = save_travel_state(&travelling());
        node.insert(KEY_DISTANCE_TRAVELLED.into(), "9999999".into());
        let (loaded, warnings) = load_travel_state(&node);
        assert_eq!(loaded.distance_travelled, loaded.distance_to_target);
        assert_eq!(warnings.len(), 1);

        node.insert(KEY_DISTANCE_TRAVELLED.into(), "-5".into());
        let (loaded, _) = load_travel_state(&node);
        assert_eq!(loaded.distance_travelled, 0.0);
    }

    #[test]
    fn autopilot_resumes_from_node() {
        let node = save_travel_state(&travelling());
        let (autopilot, warnings) =
            Autopilot::load("rover-7", Box::new(RoverProfile::default()), &node);
        assert!(warnings.is_empty());
        assert!(autopilot.is_active());
        assert_eq!(autopilot.stored_state(), VesselState::Moving);
        assert_eq!(autopilot.save(), node);
    }

    #[test]
    fn shutdown_wins_over_active() {
        let mut node = save_travel_state(&travelling());
        node.insert(KEY_SHUTDOWN.into(), "true".into());
        let (autopilot, _) = Autopilot::load("rover-8", Box::new(RoverProfile::default()), &node);
        assert!(!autopilot.is_active());
        assert_eq!(autopilot.stored_state(), VesselState::ControllerDisabled);
    }
}
