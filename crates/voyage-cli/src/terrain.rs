//! Built-in terrain layers.
//!
//! The core only knows tiles and their classification; these presets supply
//! the classification for a whole body so the driver can be used without an
//! external terrain source.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use voyage_core::{GeoPoint, GridConfig, GridError, GridModel, TerrainType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TerrainPreset {
    /// Solid ground everywhere
    Land,
    /// Open water everywhere
    Ocean,
    /// Wavy continents, ice caps and one mountain range
    Continents,
    /// Land split by a north-south ocean strait at 10°E..20°E
    Strait,
}

impl TerrainPreset {
    pub fn classify(self, point: &GeoPoint) -> TerrainType {
        match self {
            TerrainPreset::Land => TerrainType::Land,
            TerrainPreset::Ocean => TerrainType::Ocean,
            TerrainPreset::Continents => continents(point),
            TerrainPreset::Strait => {
                if (10.0..=20.0).contains(&point.lon()) && point.lat().abs() < 60.0 {
                    TerrainType::Ocean
                } else {
                    TerrainType::Land
                }
            }
        }
    }

    pub fn build(self, config: GridConfig) -> Result<GridModel, GridError> {
        let grid = GridModel::from_fn(config, |center| self.classify(center))?;
        tracing::debug!(
            preset = %self,
            rows = grid.rows(),
            cols = grid.cols(),
            "terrain grid built"
        );
        Ok(grid)
    }
}

fn continents(point: &GeoPoint) -> TerrainType {
    let lat = point.lat();
    let lon = point.lon();

    if lat.abs() > 80.0 {
        return TerrainType::Land;
    }
    // mountain range along 100°E
    if (lon - 100.0).abs() < 1.5 && lat.abs() < 40.0 {
        return TerrainType::Impassable;
    }
    let relief = (lat.to_radians() * 3.0).sin() * (lon.to_radians() * 2.0).cos()
        + 0.3 * (lon.to_radians() * 5.0).sin();
    if relief > -0.1 {
        TerrainType::Land
    } else {
        TerrainType::Ocean
    }
}

impl fmt::Display for TerrainPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerrainPreset::Land => "land",
            TerrainPreset::Ocean => "ocean",
            TerrainPreset::Continents => "continents",
            TerrainPreset::Strait => "strait",
        };
        f.write_str(name)
    }
}

impl FromStr for TerrainPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "land" => Ok(TerrainPreset::Land),
            "ocean" => Ok(TerrainPreset::Ocean),
            "continents" => Ok(TerrainPreset::Continents),
            "strait" => Ok(TerrainPreset::Strait),
            other => Err(format!("unknown terrain preset: {other}")),
        }
    }
}
