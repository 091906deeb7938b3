//! Registry of every autopilot-equipped vehicle.
//!
//! The fleet is owned by the driver and passed around explicitly. It also
//! tracks which vehicle the player is controlling, which is what turns a
//! status into `Current`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use voyage_core::{
    Autopilot, ControllerKind, GeoPoint, RoverProfile, ShipProfile, VehicleProfile, VesselState,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("unknown vehicle: {0}")]
    UnknownVehicle(String),
    #[error("vehicle already registered: {0}")]
    DuplicateVehicle(String),
}

/// Profile for a vehicle kind, with an optional speed override.
pub fn profile_for(kind: ControllerKind, speed_mps: Option<f64>) -> Box<dyn VehicleProfile> {
    match kind {
        ControllerKind::Rover => {
            let mut profile = RoverProfile::default();
            if let Some(speed) = speed_mps {
                profile.average_speed_mps = speed;
            }
            Box::new(profile)
        }
        ControllerKind::Ship => {
            let mut profile = ShipProfile::default();
            if let Some(speed) = speed_mps {
                profile.average_speed_mps = speed;
            }
            Box::new(profile)
        }
    }
}

#[derive(Debug)]
pub struct Vehicle {
    pub autopilot: Autopilot,
    /// Where the vehicle was last parked. Moving vehicles report their
    /// position along the route instead.
    pub parked_at: GeoPoint,
    pub speed_override_mps: Option<f64>,
}

impl Vehicle {
    pub fn kind(&self) -> ControllerKind {
        self.autopilot.profile().kind()
    }

    pub fn position(&self, radius_m: f64) -> GeoPoint {
        if self.autopilot.is_active() {
            if let Some(position) = self.autopilot.current_position(radius_m) {
                return position;
            }
        }
        self.parked_at
    }
}

/// One line of the fleet overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub id: String,
    pub kind: ControllerKind,
    pub state: VesselState,
    pub position: GeoPoint,
    pub remaining_m: f64,
    pub main_light: Option<String>,
}

#[derive(Debug, Default)]
pub struct Fleet {
    vehicles: BTreeMap<String, Vehicle>,
    controlled: Option<String>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: &str,
        kind: ControllerKind,
        position: GeoPoint,
        speed_override_mps: Option<f64>,
    ) -> Result<&mut Vehicle, FleetError> {
        let autopilot = Autopilot::new(id, profile_for(kind, speed_override_mps));
        self.insert(
            Vehicle {
                autopilot,
                parked_at: position,
                speed_override_mps,
            },
        )
    }

    /// Add an already built vehicle, keyed by its autopilot's id.
    pub fn insert(&mut self, vehicle: Vehicle) -> Result<&mut Vehicle, FleetError> {
        let id = vehicle.autopilot.vehicle_id().to_string();
        if self.vehicles.contains_key(&id) {
            return Err(FleetError::DuplicateVehicle(id));
        }
        tracing::info!(vehicle = %id, kind = ?vehicle.kind(), "vehicle registered");
        Ok(self.vehicles.entry(id).or_insert(vehicle))
    }

    pub fn remove(&mut self, id: &str) -> Result<Vehicle, FleetError> {
        let vehicle = self
            .vehicles
            .remove(id)
            .ok_or_else(|| FleetError::UnknownVehicle(id.to_string()))?;
        if self.controlled.as_deref() == Some(id) {
            self.controlled = None;
        }
        Ok(vehicle)
    }

    pub fn get(&self, id: &str) -> Result<&Vehicle, FleetError> {
        self.vehicles
            .get(id)
            .ok_or_else(|| FleetError::UnknownVehicle(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Vehicle, FleetError> {
        self.vehicles
            .get_mut(id)
            .ok_or_else(|| FleetError::UnknownVehicle(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.values_mut()
    }

    /// Put the player in control of `id`, or of nothing.
    pub fn set_controlled(&mut self, id: Option<&str>) -> Result<(), FleetError> {
        if let Some(id) = id {
            self.get(id)?;
        }
        self.controlled = id.map(str::to_string);
        Ok(())
    }

    pub fn controlled(&self) -> Option<&str> {
        self.controlled.as_deref()
    }

    pub fn is_controlled(&self, id: &str) -> bool {
        self.controlled.as_deref() == Some(id)
    }

    pub fn statuses(&self, radius_m: f64) -> Vec<VehicleStatus> {
        self.vehicles
            .iter()
            .map(|(id, vehicle)| VehicleStatus {
                id: id.clone(),
                kind: vehicle.kind(),
                state: vehicle.autopilot.state(self.is_controlled(id)),
                position: vehicle.position(radius_m),
                remaining_m: vehicle.autopilot.remaining_distance_to_target(),
                main_light: vehicle.autopilot.main_light().map(str::to_string),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_look_up() {
        let mut fleet = Fleet::new();
        fleet
            .register("rover-1", ControllerKind::Rover, GeoPoint::new(1.0, 2.0), None)
            .unwrap();
        fleet
            .register("ship-1", ControllerKind::Ship, GeoPoint::new(-5.0, 20.0), Some(30.0))
            .unwrap();

        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet.get("ship-1").unwrap().kind(), ControllerKind::Ship);
        assert_eq!(
            fleet.get("ship-1").unwrap().autopilot.profile().compute_speed(),
            30.0
        );
        assert_eq!(
            fleet
                .register("rover-1", ControllerKind::Rover, GeoPoint::new(0.0, 0.0), None)
                .err(),
            Some(FleetError::DuplicateVehicle("rover-1".into()))
        );
    }

    #[test]
    fn controlled_vehicle_shows_as_current() {
        let mut fleet = Fleet::new();
        fleet
            .register("rover-1", ControllerKind::Rover, GeoPoint::new(0.0, 0.0), None)
            .unwrap();
        fleet
            .register("rover-2", ControllerKind::Rover, GeoPoint::new(0.0, 1.0), None)
            .unwrap();
        fleet.set_controlled(Some("rover-2")).unwrap();

        let statuses = fleet.statuses(voyage_core::EARTH_RADIUS_M);
        assert_eq!(statuses[0].state, VesselState::Idle);
        assert_eq!(statuses[1].state, VesselState::Current);
        assert_eq!(fleet.get("rover-2").unwrap().autopilot.stored_state(), VesselState::Idle);

        assert!(fleet.set_controlled(Some("ghost")).is_err());
        fleet.remove("rover-2").unwrap();
        assert_eq!(fleet.controlled(), None);
    }
}
