//! Per-tick advancement of every vehicle in the fleet.
//!
//! The driver owns the simulation clock and a simple sun that circles the
//! equator once per day. Each tick it works out whether a vehicle is lit,
//! advances its autopilot and parks it when it arrives.

use crate::fleet::Fleet;
use serde::{Deserialize, Serialize};
use voyage_core::{GeoPoint, LightSource, PowerConditions, TickOutcome};

const SUN_LUMINOSITY_W: f64 = 3.828e26;
const SUN_DISTANCE_M: f64 = 1.496e11;

/// A sun fixed over the equator, moving west at one revolution per day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunModel {
    pub day_length_s: f64,
    /// Longitude directly under the sun at time 0
    pub noon_longitude_deg: f64,
}

impl SunModel {
    pub fn new(day_length_s: f64) -> Self {
        Self {
            day_length_s,
            noon_longitude_deg: 0.0,
        }
    }

    pub fn subsolar_point(&self, now: f64) -> GeoPoint {
        let turns = if self.day_length_s > 0.0 {
            now / self.day_length_s
        } else {
            0.0
        };
        GeoPoint::new(0.0, self.noon_longitude_deg - turns * 360.0)
    }

    /// Elevation of the sun above the local horizon at `point`, in degrees.
    pub fn elevation_deg(&self, point: &GeoPoint, now: f64) -> f64 {
        // central angle on the unit sphere, in degrees
        let angle = point.distance_to(&self.subsolar_point(now), 1.0).to_degrees();
        90.0 - angle
    }

    /// Sun conditions at `point`; below the horizon counts as dark.
    pub fn conditions_at(&self, point: &GeoPoint, now: f64) -> PowerConditions {
        let elevation = self.elevation_deg(point, now);
        if elevation > 0.0 {
            PowerConditions::sunlit(elevation)
        } else {
            PowerConditions::dark()
        }
    }

    pub fn light_sources(&self) -> Vec<LightSource> {
        vec![LightSource::new("Sun", SUN_LUMINOSITY_W, SUN_DISTANCE_M)]
    }
}

/// What happened during one tick across the fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub time: f64,
    pub moving: usize,
    pub blocked: usize,
    pub distance_m: f64,
    pub arrived: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Driver {
    pub sun: SunModel,
    pub radius_m: f64,
    now: f64,
}

impl Driver {
    pub fn new(sun: SunModel, radius_m: f64, now: f64) -> Self {
        Self { sun, radius_m, now }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Refresh every vehicle's view of the light sources.
    pub fn system_check(&self, fleet: &mut Fleet) {
        let sources = self.sun.light_sources();
        for vehicle in fleet.iter_mut() {
            vehicle.autopilot.system_check(&sources);
        }
    }

    /// Advance the clock by `dt` seconds and every vehicle with it.
    pub fn tick(&mut self, fleet: &mut Fleet, dt: f64) -> TickReport {
        self.now += dt.max(0.0);
        let now = self.now;
        let mut report = TickReport {
            time: now,
            ..TickReport::default()
        };

        for vehicle in fleet.iter_mut() {
            let position = vehicle.position(self.radius_m);
            let power = self.sun.conditions_at(&position, now);

            match vehicle.autopilot.advance(now, &power) {
                TickOutcome::Idle => {}
                TickOutcome::Blocked => report.blocked += 1,
                TickOutcome::Advanced { distance_m } => {
                    report.moving += 1;
                    report.distance_m += distance_m;
                }
                TickOutcome::Arrived => {
                    if let Some(destination) =
                        vehicle.autopilot.route().and_then(|route| route.destination())
                    {
                        vehicle.parked_at = *destination;
                    }
                    let id = vehicle.autopilot.vehicle_id().to_string();
                    tracing::info!(vehicle = %id, at = %vehicle.parked_at, "vehicle arrived");
                    report.arrived.push(id);
                }
            }
        }

        report
    }

    /// Tick repeatedly until `duration` seconds have passed. Stops early
    /// once nothing in the fleet is travelling.
    pub fn run(&mut self, fleet: &mut Fleet, duration: f64, step: f64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        if step <= 0.0 {
            return reports;
        }

        let end = self.now + duration.max(0.0);
        while self.now < end {
            let dt = step.min(end - self.now);
            reports.push(self.tick(fleet, dt));
            if fleet.iter().all(|vehicle| !vehicle.autopilot.is_active()) {
                break;
            }
        }

        tracing::info!(
            ticks = reports.len(),
            time = self.now,
            arrived = reports.iter().map(|r| r.arrived.len()).sum::<usize>(),
            "simulation finished"
        );
        reports
    }
}
