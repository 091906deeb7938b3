//! Driver for the voyage autopilot: fleet registry, simulation clock, save
//! file and the `voyage` command line.

pub mod config;
pub mod driver;
pub mod fleet;
pub mod session;
pub mod store;
pub mod terrain;

pub use config::Config;
pub use driver::{Driver, SunModel, TickReport};
pub use fleet::{profile_for, Fleet, FleetError, Vehicle, VehicleStatus};
pub use session::Session;
pub use store::{LoadedFleet, SaveFile, StoreError};
pub use terrain::TerrainPreset;
