//! JSON save file for the fleet.
//!
//! Each vehicle is written as its kind, parked position and the flat
//! key/value node produced by the core persistence layer.

use crate::fleet::{profile_for, Fleet, FleetError, Vehicle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use voyage_core::{Autopilot, ConfigNode, ControllerKind, GeoPoint, LoadWarning};

const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("save file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save file version {0}")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Fleet(#[from] FleetError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedVehicle {
    pub kind: ControllerKind,
    pub parked_at: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_override_mps: Option<f64>,
    #[serde(default)]
    pub fields: ConfigNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Simulation clock when the file was written
    pub sim_time: f64,
    #[serde(default)]
    pub controlled: Option<String>,
    #[serde(default)]
    pub vehicles: BTreeMap<String, SavedVehicle>,
}

/// Fleet and clock restored from disk.
#[derive(Debug)]
pub struct LoadedFleet {
    pub fleet: Fleet,
    pub sim_time: f64,
    /// Recovered field problems, keyed by vehicle id
    pub warnings: Vec<(String, LoadWarning)>,
}

impl SaveFile {
    pub fn capture(fleet: &Fleet, sim_time: f64) -> Self {
        let vehicles = fleet
            .iter()
            .map(|vehicle| {
                (
                    vehicle.autopilot.vehicle_id().to_string(),
                    SavedVehicle {
                        kind: vehicle.kind(),
                        parked_at: vehicle.parked_at,
                        speed_override_mps: vehicle.speed_override_mps,
                        fields: vehicle.autopilot.save(),
                    },
                )
            })
            .collect();

        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now(),
            sim_time,
            controlled: fleet.controlled().map(str::to_string),
            vehicles,
        }
    }

    pub fn restore(self) -> Result<LoadedFleet, StoreError> {
        if self.version != SAVE_VERSION {
            return Err(StoreError::UnsupportedVersion(self.version));
        }

        let mut fleet = Fleet::new();
        let mut warnings = Vec::new();
        for (id, saved) in self.vehicles {
            let profile = profile_for(saved.kind, saved.speed_override_mps);
            let (autopilot, vehicle_warnings) = Autopilot::load(id.as_str(), profile, &saved.fields);
            warnings.extend(vehicle_warnings.into_iter().map(|w| (id.clone(), w)));
            fleet.insert(Vehicle {
                autopilot,
                parked_at: saved.parked_at,
                speed_override_mps: saved.speed_override_mps,
            })?;
        }

        // a stale controlled id is dropped rather than failing the load
        if let Some(id) = self.controlled.as_deref() {
            if fleet.set_controlled(Some(id)).is_err() {
                tracing::warn!(vehicle = %id, "controlled vehicle missing from save file");
            }
        }

        Ok(LoadedFleet {
            fleet,
            sim_time: self.sim_time,
            warnings,
        })
    }
}

pub fn save(path: &Path, fleet: &Fleet, sim_time: f64) -> Result<(), StoreError> {
    let file = SaveFile::capture(fleet, sim_time);
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json)?;
    tracing::debug!(path = %path.display(), vehicles = fleet.len(), "fleet saved");
    Ok(())
}

pub fn load(path: &Path) -> Result<LoadedFleet, StoreError> {
    let json = fs::read_to_string(path)?;
    let file: SaveFile = serde_json::from_str(&json)?;
    tracing::debug!(
        path = %path.display(),
        saved_at = %file.saved_at,
        vehicles = file.vehicles.len(),
        "fleet loaded"
    );
    file.restore()
}

/// Load the fleet, or start an empty one when no save file exists yet.
pub fn load_or_default(path: &Path) -> Result<LoadedFleet, StoreError> {
    match load(path) {
        Err(StoreError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no save file, starting an empty fleet");
            Ok(LoadedFleet {
                fleet: Fleet::new(),
                sim_time: 0.0,
                warnings: Vec::new(),
            })
        }
        other => other,
    }
}
