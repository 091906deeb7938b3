//! One command-line session: terrain, fleet and clock loaded from the save
//! file, changed by a command, then written back.

use crate::config::Config;
use crate::driver::{Driver, SunModel, TickReport};
use crate::fleet::{Fleet, VehicleStatus};
use crate::store::{self, StoreError};
use anyhow::{bail, Context, Result};
use voyage_core::{
    encode, find_path, AutopilotError, ControllerKind, GeoPoint, GridModel, PathResult,
    PowerConditions, SummaryRow, TerrainMask,
};

pub struct Session {
    pub config: Config,
    pub grid: GridModel,
    pub fleet: Fleet,
    pub driver: Driver,
}

impl Session {
    pub fn open(config: Config) -> Result<Self> {
        let grid = config
            .terrain
            .build(config.grid_config())
            .context("building terrain grid")?;
        let loaded = store::load_or_default(&config.save_path)
            .with_context(|| format!("loading {}", config.save_path.display()))?;
        for (vehicle, warning) in &loaded.warnings {
            tracing::warn!(%vehicle, %warning, "save file field recovered");
        }

        let driver = Driver::new(
            SunModel::new(config.day_length_s),
            config.body_radius_m,
            loaded.sim_time,
        );
        Ok(Self {
            config,
            grid,
            fleet: loaded.fleet,
            driver,
        })
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        store::save(&self.config.save_path, &self.fleet, self.driver.now())
    }

    pub fn add_vehicle(
        &mut self,
        id: &str,
        kind: ControllerKind,
        position: GeoPoint,
        speed_mps: Option<f64>,
    ) -> Result<()> {
        self.fleet.register(id, kind, position, speed_mps)?;
        Ok(())
    }

    pub fn remove_vehicle(&mut self, id: &str) -> Result<()> {
        self.fleet.remove(id)?;
        Ok(())
    }

    /// Plan a route for a vehicle from where it is now. Returns the distance.
    pub fn plan_route(&mut self, id: &str, target: GeoPoint) -> Result<f64> {
        let radius = self.config.body_radius_m;
        let vehicle = self.fleet.get_mut(id)?;
        let from = vehicle.position(radius);
        let allowed = vehicle.autopilot.profile().allowed_terrain();
        let distance = vehicle
            .autopilot
            .try_find_route(&self.grid, &from, target.lat(), target.lon(), allowed)
            .with_context(|| format!("planning {id} from {from} to {target}"))?;
        Ok(distance)
    }

    pub fn activate(&mut self, id: &str) -> Result<()> {
        let now = self.driver.now();
        let vehicle = self.fleet.get_mut(id)?;
        match vehicle.autopilot.try_activate() {
            Ok(()) => {
                // start the clock for this leg at the current time
                vehicle.autopilot.advance(now, &PowerConditions::dark());
                Ok(())
            }
            Err(AutopilotError::ActivateWithoutRoute) => {
                bail!("{id} has no route, run `voyage route {id} <lat> <lon>` first")
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn deactivate(&mut self, id: &str) -> Result<()> {
        let radius = self.config.body_radius_m;
        let vehicle = self.fleet.get_mut(id)?;
        vehicle.parked_at = vehicle.position(radius);
        vehicle.autopilot.deactivate();
        Ok(())
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let radius = self.config.body_radius_m;
        let vehicle = self.fleet.get_mut(id)?;
        if enabled {
            vehicle.autopilot.enable();
        } else {
            vehicle.parked_at = vehicle.position(radius);
            vehicle.autopilot.disable();
        }
        Ok(())
    }

    pub fn control(&mut self, id: Option<&str>) -> Result<()> {
        self.fleet.set_controlled(id)?;
        Ok(())
    }

    pub fn run(&mut self, duration_s: f64) -> Vec<TickReport> {
        self.driver.system_check(&mut self.fleet);
        self.driver.run(&mut self.fleet, duration_s, self.config.tick_seconds)
    }

    pub fn statuses(&self) -> Vec<VehicleStatus> {
        self.fleet.statuses(self.config.body_radius_m)
    }

    pub fn summary(&self, id: &str) -> Result<Vec<SummaryRow>> {
        Ok(self.fleet.get(id)?.autopilot.summary_rows())
    }

    /// Plan between two points without touching the fleet.
    pub fn plan(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        allowed: TerrainMask,
    ) -> Result<(PathResult, String)> {
        let result = find_path(&from, &to, &self.grid, allowed)?;
        let encoded = encode(&result.route);
        Ok((result, encoded))
    }
}
