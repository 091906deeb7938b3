//! Core data models shared by the planner and the autopilot.

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered waypoints from origin to destination with the total distance.
///
/// A route is built once and never edited; a new search produces a new
/// route that replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    waypoints: Vec<GeoPoint>,
    distance_m: f64,
}

impl Route {
    pub fn new(waypoints: Vec<GeoPoint>, distance_m: f64) -> Self {
        Self {
            waypoints,
            distance_m: if distance_m.is_finite() { distance_m.max(0.0) } else { 0.0 },
        }
    }

    /// Route whose distance is the length of the polyline through `waypoints`.
    pub fn from_waypoints(waypoints: Vec<GeoPoint>, radius_m: f64) -> Self {
        let distance_m = polyline_length(&waypoints, radius_m);
        Self::new(waypoints, distance_m)
    }

    pub fn waypoints(&self) -> &[GeoPoint] {
        &self.waypoints
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn origin(&self) -> Option<&GeoPoint> {
        self.waypoints.first()
    }

    pub fn destination(&self) -> Option<&GeoPoint> {
        self.waypoints.last()
    }

    /// Position after travelling `travelled_m` along the legs of the route.
    ///
    /// Clamps to the origin and destination at either end.
    pub fn position_at(&self, travelled_m: f64, radius_m: f64) -> Option<GeoPoint> {
        let first = *self.waypoints.first()?;
        if travelled_m <= 0.0 {
            return Some(first);
        }

        let mut remaining = travelled_m;
        for leg in self.waypoints.windows(2) {
            let length = leg[0].distance_to(&leg[1], radius_m);
            if remaining <= length {
                return Some(leg[0].towards(&leg[1], remaining, radius_m));
            }
            remaining -= length;
        }
        self.waypoints.last().copied()
    }
}

/// Sum of the great-circle legs between consecutive points.
pub fn polyline_length(points: &[GeoPoint], radius_m: f64) -> f64 {
    points
        .windows(2)
        .map(|leg| leg[0].distance_to(&leg[1], radius_m))
        .sum()
}

/// Status of a vehicle as shown to the player. Derived, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselState {
    /// No destination, or stopped by the user
    #[default]
    Idle,
    /// Automation switched off for this vehicle
    ControllerDisabled,
    /// Display override for the vehicle the player is controlling
    Current,
    /// Progressing along a route
    Moving,
    /// Blocked until the power source comes back
    AwaitingSunlight,
}

impl VesselState {
    pub fn label(&self) -> &'static str {
        match self {
            VesselState::Idle => "Idle",
            VesselState::ControllerDisabled => "Controller disabled",
            VesselState::Current => "Current",
            VesselState::Moving => "Moving",
            VesselState::AwaitingSunlight => "Awaiting sunlight",
        }
    }
}

impl fmt::Display for VesselState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of vehicle an autopilot drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Rover,
    Ship,
}

/// One line of the status panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
    pub tooltip: String,
}

impl SummaryRow {
    pub fn new(
        label: impl Into<String>,
        value: impl Into<String>,
        tooltip: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            tooltip: tooltip.into(),
        }
    }
}

/// Format a distance in meters the way the status panel shows it.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m >= 1000.0 {
        format!("{:.2} km", distance_m / 1000.0)
    } else {
        format!("{:.0} m", distance_m)
    }
}
