pub mod autopilot;
pub mod codec;
pub mod geo;
pub mod grid;
pub mod models;
pub mod persistence;
pub mod profile;
pub mod route_engine;

pub use autopilot::{
    Autopilot, AutopilotError, StateChange, SubscriptionId, TickOutcome, TravelState,
};
pub use codec::{decode, encode, tiles_to_waypoints, CodecError};
pub use geo::{haversine_distance, GeoPoint, EARTH_RADIUS_M};
pub use grid::{
    GridConfig, GridError, GridIndex, GridModel, TerrainMask, TerrainTile, TerrainType,
};
pub use models::{format_distance, ControllerKind, Route, SummaryRow, VesselState};
pub use persistence::{load_travel_state, save_travel_state, ConfigNode, LoadWarning};
pub use profile::{
    dominant_light_source, LightSource, PowerConditions, RoverProfile, ShipProfile,
    VehicleProfile,
};
pub use route_engine::{
    find_path, find_path_with_limits, outcome_distance, PathResult, RouteError, SearchLimits,
};
