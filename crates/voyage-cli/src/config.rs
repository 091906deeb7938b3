//! Driver configuration from environment.

use crate::terrain::TerrainPreset;
use std::env;
use std::path::PathBuf;
use voyage_core::{GridConfig, EARTH_RADIUS_M};

#[derive(Debug, Clone)]
pub struct Config {
    /// Angular size of one grid cell in degrees
    pub cell_size_deg: f64,
    pub body_radius_m: f64,
    pub terrain: TerrainPreset,
    /// JSON save file holding the fleet
    pub save_path: PathBuf,
    /// Simulated seconds between two progress ticks
    pub tick_seconds: f64,
    /// Length of one day-night cycle in simulated seconds
    pub day_length_s: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values use defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str, default: f64| {
            lookup(key)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite() && *value > 0.0)
                .unwrap_or(default)
        };

        Self {
            cell_size_deg: number("VOYAGE_CELL_SIZE_DEG", 1.0),
            body_radius_m: number("VOYAGE_BODY_RADIUS_M", EARTH_RADIUS_M),
            terrain: lookup("VOYAGE_TERRAIN")
                .and_then(|s| s.parse().ok())
                .unwrap_or(TerrainPreset::Continents),
            save_path: lookup("VOYAGE_SAVE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("voyage-save.json")),
            tick_seconds: number("VOYAGE_TICK_SECONDS", 60.0),
            day_length_s: number("VOYAGE_DAY_LENGTH_S", 86_400.0),
        }
    }

    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            cell_size_deg: self.cell_size_deg,
            body_radius_m: self.body_radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unset_values_use_defaults() {
        let config = Config::default();
        assert_eq!(config.cell_size_deg, 1.0);
        assert_eq!(config.body_radius_m, EARTH_RADIUS_M);
        assert_eq!(config.terrain, TerrainPreset::Continents);
        assert_eq!(config.save_path, PathBuf::from("voyage-save.json"));
        assert_eq!(config.tick_seconds, 60.0);
    }

    #[test]
    fn values_are_read_and_bad_ones_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("VOYAGE_CELL_SIZE_DEG", "2.5"),
            ("VOYAGE_BODY_RADIUS_M", "600000"),
            ("VOYAGE_TERRAIN", "strait"),
            ("VOYAGE_SAVE_PATH", "/tmp/fleet.json"),
            ("VOYAGE_TICK_SECONDS", "-3"),
            ("VOYAGE_DAY_LENGTH_S", "soon"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.cell_size_deg, 2.5);
        assert_eq!(config.body_radius_m, 600_000.0);
        assert_eq!(config.terrain, TerrainPreset::Strait);
        assert_eq!(config.save_path, PathBuf::from("/tmp/fleet.json"));
        assert_eq!(config.tick_seconds, 60.0);
        assert_eq!(config.day_length_s, 86_400.0);
        assert_eq!(config.grid_config().body_radius_m, 600_000.0);
    }
}
