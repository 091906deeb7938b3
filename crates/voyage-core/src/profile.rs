//! Vehicle capability profiles.
//!
//! The autopilot is the same for every vehicle; what differs between a
//! rover and a ship (speed, power model, where it may drive) is supplied
//! through [`VehicleProfile`].

use crate::grid::TerrainMask;
use crate::models::ControllerKind;
use serde::{Deserialize, Serialize};

/// A light source the vehicle could draw solar power from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    pub name: String,
    /// Emitted power, any consistent unit
    pub luminosity: f64,
    /// Distance from the vehicle in meters
    pub distance_m: f64,
}

impl LightSource {
    pub fn new(name: impl Into<String>, luminosity: f64, distance_m: f64) -> Self {
        Self {
            name: name.into(),
            luminosity,
            distance_m,
        }
    }

    /// Brightness as seen from the vehicle (inverse-square falloff).
    pub fn apparent_brightness(&self) -> f64 {
        if self.distance_m <= 0.0 || !self.distance_m.is_finite() || !self.luminosity.is_finite() {
            return 0.0;
        }
        self.luminosity / (self.distance_m * self.distance_m)
    }
}

/// Pick the brightest light source as seen from the vehicle. Ties go to the
/// source listed first.
pub fn dominant_light_source(sources: &[LightSource]) -> Option<&LightSource> {
    sources
        .iter()
        .filter(|source| source.apparent_brightness() > 0.0)
        .fold(None, |best: Option<&LightSource>, source| match best {
            Some(best) if best.apparent_brightness() >= source.apparent_brightness() => Some(best),
            _ => Some(source),
        })
}

/// Power situation of a vehicle at one tick, supplied by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PowerConditions {
    /// Elevation of the dominant light source above the local horizon in
    /// degrees, `None` when no light source is known
    pub light_elevation_deg: Option<f64>,
}

impl PowerConditions {
    pub fn sunlit(elevation_deg: f64) -> Self {
        Self {
            light_elevation_deg: Some(elevation_deg),
        }
    }

    pub fn dark() -> Self {
        Self {
            light_elevation_deg: None,
        }
    }
}

/// Capabilities the autopilot needs from a concrete vehicle.
pub trait VehicleProfile: Send {
    fn kind(&self) -> ControllerKind;

    /// Terrain the vehicle may cross when no mask is given explicitly.
    fn allowed_terrain(&self) -> TerrainMask {
        TerrainMask::LAND_OR_OCEAN
    }

    /// Average travel speed in meters per second.
    fn compute_speed(&self) -> f64;

    /// Whether the vehicle has enough power to keep moving.
    fn check_power(&self, conditions: &PowerConditions) -> bool;
}

/// Wheeled surface vehicle, usually solar powered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoverProfile {
    pub average_speed_mps: f64,
    /// Vehicle depends on solar panels
    pub solar_powered: bool,
    /// Generators that work in the dark (fuel cells, RTGs)
    pub has_other_generation: bool,
    /// Light must be at least this high above the horizon for the panels
    pub min_light_elevation_deg: f64,
}

impl Default for RoverProfile {
    fn default() -> Self {
        Self {
            average_speed_mps: 10.0,
            solar_powered: true,
            has_other_generation: false,
            min_light_elevation_deg: 0.0,
        }
    }
}

impl VehicleProfile for RoverProfile {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Rover
    }

    fn allowed_terrain(&self) -> TerrainMask {
        TerrainMask::LAND
    }

    fn compute_speed(&self) -> f64 {
        self.average_speed_mps.max(0.0)
    }

    fn check_power(&self, conditions: &PowerConditions) -> bool {
        if !self.solar_powered || self.has_other_generation {
            return true;
        }
        conditions
            .light_elevation_deg
            .is_some_and(|elevation| elevation >= self.min_light_elevation_deg)
    }
}

/// Surface ship. Carries its own power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipProfile {
    pub average_speed_mps: f64,
}

impl Default for ShipProfile {
    fn default() -> Self {
        Self {
            average_speed_mps: 15.0,
        }
    }
}

impl VehicleProfile for ShipProfile {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Ship
    }

    fn allowed_terrain(&self) -> TerrainMask {
        TerrainMask::OCEAN
    }

    fn compute_speed(&self) -> f64 {
        self.average_speed_mps.max(0.0)
    }

    fn check_power(&self, _conditions: &PowerConditions) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_source_uses_inverse_square() {
        let sources = vec![
            LightSource::new("Far Giant", 100.0, 10.0),
            LightSource::new("Near Dwarf", 2.0, 1.0),
            LightSource::new("Dead", 0.0, 1.0),
        ];
        let dominant = dominant_light_source(&sources).unwrap();
        assert_eq!(dominant.name, "Near Dwarf");
        assert!(dominant_light_source(&[]).is_none());
    }

    #[test]
    fn solar_rover_needs_light_above_threshold() {
        let rover = RoverProfile {
            min_light_elevation_deg: 5.0,
            ..RoverProfile::default()
        };
        assert!(rover.check_power(&PowerConditions::sunlit(10.0)));
        assert!(!rover.check_power(&PowerConditions::sunlit(2.0)));
        assert!(!rover.check_power(&PowerConditions::dark()));
    }

    #[test]
    fn rover_with_generator_ignores_darkness() {
        let rover = RoverProfile {
            has_other_generation: true,
            ..RoverProfile::default()
        };
        assert!(rover.check_power(&PowerConditions::dark()));
    }

    #[test]
    fn ships_stay_on_water() {
        let ship = ShipProfile::default();
        assert_eq!(ship.kind(), ControllerKind::Ship);
        assert_eq!(ship.allowed_terrain(), TerrainMask::OCEAN);
        assert!(ship.check_power(&PowerConditions::dark()));
    }
}
