//! Per-vehicle autopilot state machine.
//!
//! States:
//! - `Idle` - no destination, or stopped by the user
//! - `ControllerDisabled` - automation switched off for this vehicle
//! - `Moving` - progressing along a route
//! - `AwaitingSunlight` - active, but the vehicle has no power to move
//!
//! `Current` is never stored; [`Autopilot::state`] reports it for the
//! vehicle the player is controlling.
//!
//! Every assignment of the stored state is delivered to the observers, even
//! when the value does not change.

use crate::geo::GeoPoint;
use crate::grid::{GridModel, TerrainMask};
use crate::models::{format_distance, Route, SummaryRow, VesselState};
use crate::profile::{dominant_light_source, LightSource, PowerConditions, VehicleProfile};
use crate::route_engine::{find_path, RouteError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remaining distance below which a leg counts as finished.
const ARRIVAL_EPSILON_M: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutopilotError {
    #[error("no route to target: {0}")]
    NoPathFound(#[from] RouteError),
    #[error("no route to follow, find a route first")]
    ActivateWithoutRoute,
    #[error("controller is disabled for this vehicle")]
    ControllerDisabled,
    #[error("vehicle already completed this route")]
    AlreadyAtTarget,
    #[error("vehicle is already travelling, stop it before planning a new route")]
    AlreadyActive,
}

/// Everything the autopilot persists for one vehicle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelState {
    pub target_latitude: f64,
    pub target_longitude: f64,
    /// Length of the current route in meters
    pub distance_to_target: f64,
    /// Progress along the current route in meters
    pub distance_travelled: f64,
    /// Simulation time of the last progress tick, 0 when not yet stamped
    pub last_time_updated: f64,
    pub active: bool,
    pub shutdown: bool,
    pub route: Option<Route>,
}

impl TravelState {
    pub fn remaining_distance(&self) -> f64 {
        (self.distance_to_target - self.distance_travelled).max(0.0)
    }

    /// A route exists and all of it has been driven.
    pub fn leg_complete(&self) -> bool {
        self.distance_to_target > 0.0 && self.remaining_distance() <= ARRIVAL_EPSILON_M
    }

    pub fn target(&self) -> GeoPoint {
        GeoPoint::new(self.target_latitude, self.target_longitude)
    }

    fn clear_leg(&mut self) {
        self.active = false;
        self.target_latitude = 0.0;
        self.target_longitude = 0.0;
        self.distance_to_target = 0.0;
        self.distance_travelled = 0.0;
        self.route = None;
    }
}

/// Delivered to observers on every state assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub vehicle_id: String,
    pub previous: VesselState,
    pub current: VesselState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StateChange) + Send>;

/// Result of one progress tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Autopilot not active, nothing to do
    Idle,
    /// Active but without power; time passed without progress
    Blocked,
    /// Progress made this tick, possibly zero
    Advanced { distance_m: f64 },
    /// The leg was completed this tick
    Arrived,
}

pub struct Autopilot {
    vehicle_id: String,
    profile: Box<dyn VehicleProfile>,
    travel: TravelState,
    state: VesselState,
    main_light: Option<String>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for Autopilot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autopilot")
            .field("vehicle_id", &self.vehicle_id)
            .field("kind", &self.profile.kind())
            .field("travel", &self.travel)
            .field("state", &self.state)
            .field("main_light", &self.main_light)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Autopilot {
    /// Fresh autopilot: inactive, no target, zero distances.
    pub fn new(vehicle_id: impl Into<String>, profile: Box<dyn VehicleProfile>) -> Self {
        Self::with_travel_state(vehicle_id, profile, TravelState::default())
    }

    /// Autopilot resuming from persisted travel state.
    pub fn with_travel_state(
        vehicle_id: impl Into<String>,
        profile: Box<dyn VehicleProfile>,
        mut travel: TravelState,
    ) -> Self {
        travel.distance_to_target = travel.distance_to_target.max(0.0);
        travel.distance_travelled = travel
            .distance_travelled
            .clamp(0.0, travel.distance_to_target);

        let state = if travel.shutdown {
            travel.active = false;
            VesselState::ControllerDisabled
        } else if travel.active {
            VesselState::Moving
        } else {
            VesselState::Idle
        };

        Self {
            vehicle_id: vehicle_id.into(),
            profile,
            travel,
            state,
            main_light: None,
            observers: Vec::new(),
            next_subscription: 1,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn profile(&self) -> &dyn VehicleProfile {
        self.profile.as_ref()
    }

    pub fn travel_state(&self) -> &TravelState {
        &self.travel
    }

    pub fn route(&self) -> Option<&Route> {
        self.travel.route.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.travel.active
    }

    pub fn is_shutdown(&self) -> bool {
        self.travel.shutdown
    }

    /// Name of the light source picked by the last system check.
    pub fn main_light(&self) -> Option<&str> {
        self.main_light.as_deref()
    }

    // ---- Status -------------------------------------------------------

    /// Status to display. `under_player_control` marks the vehicle the
    /// player is driving, which always shows as `Current`.
    pub fn state(&self, under_player_control: bool) -> VesselState {
        if under_player_control {
            VesselState::Current
        } else {
            self.state
        }
    }

    /// Stored state, ignoring the `Current` override.
    pub fn stored_state(&self) -> VesselState {
        self.state
    }

    pub fn state_label(&self, under_player_control: bool) -> &'static str {
        self.state(under_player_control).label()
    }

    pub fn remaining_distance_to_target(&self) -> f64 {
        self.travel.remaining_distance()
    }

    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        vec![
            SummaryRow::new(
                "Target latitude",
                format!("{:.4}°", self.travel.target_latitude),
                "Latitude of the current destination",
            ),
            SummaryRow::new(
                "Target longitude",
                format!("{:.4}°", self.travel.target_longitude),
                "Longitude of the current destination",
            ),
            SummaryRow::new(
                "Distance to target",
                format_distance(self.remaining_distance_to_target()),
                "Distance left along the planned route",
            ),
        ]
    }

    /// Estimated position along the route after the distance travelled so far.
    pub fn current_position(&self, radius_m: f64) -> Option<GeoPoint> {
        self.travel
            .route
            .as_ref()?
            .position_at(self.travel.distance_travelled, radius_m)
    }

    // ---- Observers ----------------------------------------------------

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    fn set_state(&mut self, state: VesselState) {
        let change = StateChange {
            vehicle_id: self.vehicle_id.clone(),
            previous: self.state,
            current: state,
        };
        self.state = state;
        for (_, observer) in &mut self.observers {
            observer(&change);
        }
    }

    // ---- Commands -----------------------------------------------------

    /// Plan a route from `current` to the target using the profile's
    /// terrain mask. Returns false and leaves the state untouched when no
    /// route exists.
    pub fn find_route(
        &mut self,
        grid: &GridModel,
        current: &GeoPoint,
        target_lat: f64,
        target_lon: f64,
    ) -> bool {
        let allowed = self.profile.allowed_terrain();
        self.find_route_with(grid, current, target_lat, target_lon, allowed)
    }

    pub fn find_route_with(
        &mut self,
        grid: &GridModel,
        current: &GeoPoint,
        target_lat: f64,
        target_lon: f64,
        allowed: TerrainMask,
    ) -> bool {
        match self.try_find_route(grid, current, target_lat, target_lon, allowed) {
            Ok(_) => true,
            Err(err) => {
                tracing::info!(vehicle = %self.vehicle_id, error = %err, "route planning failed");
                false
            }
        }
    }

    /// Plan a route and return its length in meters.
    pub fn try_find_route(
        &mut self,
        grid: &GridModel,
        current: &GeoPoint,
        target_lat: f64,
        target_lon: f64,
        allowed: TerrainMask,
    ) -> Result<f64, AutopilotError> {
        if self.travel.active {
            return Err(AutopilotError::AlreadyActive);
        }

        let target = GeoPoint::new(target_lat, target_lon);
        let result = find_path(current, &target, grid, allowed)?;
        let distance = result.distance_m();

        // only reached while inactive: a new route is always a fresh leg
        self.travel.distance_travelled = 0.0;
        self.travel.target_latitude = target.lat();
        self.travel.target_longitude = target.lon();
        self.travel.distance_to_target = distance;
        self.travel.route = Some(result.route);

        tracing::debug!(
            vehicle = %self.vehicle_id,
            %target,
            distance_m = distance,
            waypoints = self.travel.route.as_ref().map(Route::len).unwrap_or(0),
            "route planned"
        );
        Ok(distance)
    }

    /// Start following the planned route. Returns the resulting active flag.
    pub fn activate(&mut self) -> bool {
        if let Err(err) = self.try_activate() {
            tracing::warn!(vehicle = %self.vehicle_id, error = %err, "activation rejected");
        }
        self.travel.active
    }

    pub fn try_activate(&mut self) -> Result<(), AutopilotError> {
        if self.travel.shutdown {
            return Err(AutopilotError::ControllerDisabled);
        }
        if self.travel.active {
            return Ok(());
        }
        if self.travel.route.is_none() || self.travel.distance_to_target <= 0.0 {
            return Err(AutopilotError::ActivateWithoutRoute);
        }
        if self.travel.leg_complete() {
            return Err(AutopilotError::AlreadyAtTarget);
        }

        self.travel.distance_travelled = 0.0;
        self.travel.last_time_updated = 0.0;
        self.travel.active = true;
        tracing::debug!(
            vehicle = %self.vehicle_id,
            distance_m = self.travel.distance_to_target,
            "autopilot activated"
        );
        self.set_state(VesselState::Moving);
        Ok(())
    }

    /// Stop travelling and forget the target. Returns true once inactive.
    pub fn deactivate(&mut self) -> bool {
        self.travel.clear_leg();
        let state = if self.travel.shutdown {
            VesselState::ControllerDisabled
        } else {
            VesselState::Idle
        };
        tracing::debug!(vehicle = %self.vehicle_id, "autopilot deactivated");
        self.set_state(state);
        !self.travel.active
    }

    /// Switch automation off for this vehicle. Stops any travel at once.
    pub fn disable(&mut self) {
        self.travel.shutdown = true;
        self.travel.clear_leg();
        self.set_state(VesselState::ControllerDisabled);
    }

    /// Switch automation back on. Only leaves `ControllerDisabled`; an
    /// enabled controller is left as it is.
    pub fn enable(&mut self) {
        if !self.travel.shutdown {
            return;
        }
        self.travel.shutdown = false;
        self.set_state(VesselState::Idle);
    }

    /// Refresh what the vehicle knows about its surroundings. Does not touch
    /// travel state.
    pub fn system_check(&mut self, light_sources: &[LightSource]) {
        self.main_light = dominant_light_source(light_sources).map(|source| source.name.clone());
        tracing::debug!(
            vehicle = %self.vehicle_id,
            main_light = self.main_light.as_deref().unwrap_or("none"),
            "system check"
        );
    }

    /// Advance progress to simulation time `now`.
    ///
    /// The first tick after activation only records the time. Without power
    /// the vehicle waits and the elapsed time is lost. Progress never
    /// overshoots the route; completing it deactivates the autopilot while
    /// keeping the route and distances, so the remaining distance reads 0.
    pub fn advance(&mut self, now: f64, power: &PowerConditions) -> TickOutcome {
        let last = self.travel.last_time_updated;
        self.travel.last_time_updated = now;

        if !self.travel.active {
            return TickOutcome::Idle;
        }
        if last <= 0.0 || now <= last {
            return TickOutcome::Advanced { distance_m: 0.0 };
        }

        if !self.profile.check_power(power) {
            self.set_state(VesselState::AwaitingSunlight);
            return TickOutcome::Blocked;
        }
        self.set_state(VesselState::Moving);

        let remaining = self.travel.remaining_distance();
        let step = (self.profile.compute_speed() * (now - last)).clamp(0.0, remaining);
        self.travel.distance_travelled += step;

        if remaining - step <= ARRIVAL_EPSILON_M {
            self.travel.distance_travelled = self.travel.distance_to_target;
            self.travel.active = false;
            tracing::info!(
                vehicle = %self.vehicle_id,
                distance_m = self.travel.distance_to_target,
                "arrived at target"
            );
            self.set_state(VesselState::Idle);
            return TickOutcome::Arrived;
        }

        TickOutcome::Advanced { distance_m: step }
    }
}
