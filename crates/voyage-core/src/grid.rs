//! Discretized surface grid.
//!
//! The surface is tiled with hexagonal cells laid out in offset rows of
//! constant latitude ("odd-r": odd rows are shifted east by half a cell).
//! Every tile has exactly six neighbors. Columns wrap around the
//! antimeridian and rows past a pole fold back into the polar row on the far
//! side of the pole.

use crate::geo::{GeoPoint, EARTH_RADIUS_M};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

/// Largest supported cell size. Coarser grids degenerate near the poles.
pub const MAX_CELL_SIZE_DEG: f64 = 30.0;

/// Largest supported number of tiles, about a 0.1° grid.
pub const MAX_TILE_COUNT: u64 = 8_000_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("invalid grid configuration: {0}")]
    InvalidConfig(String),
    #[error("grid index ({row}, {col}) is outside the grid")]
    IndexOutOfRange { row: u32, col: u32 },
}

/// Resolution of the grid and the body it covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Angular size of a cell in degrees
    pub cell_size_deg: f64,
    /// Radius used for every distance on this grid
    pub body_radius_m: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: 1.0,
            body_radius_m: EARTH_RADIUS_M,
        }
    }
}

/// Terrain classification of a tile. The discriminants are mask bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TerrainType {
    Land = 1,
    Ocean = 2,
    Impassable = 4,
}

impl TerrainType {
    pub fn bit(self) -> u8 {
        self as u8
    }
}

/// Set of terrain types a search may traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TerrainMask(u8);

impl TerrainMask {
    pub const NONE: TerrainMask = TerrainMask(0);
    pub const LAND: TerrainMask = TerrainMask(TerrainType::Land as u8);
    pub const OCEAN: TerrainMask = TerrainMask(TerrainType::Ocean as u8);
    pub const LAND_OR_OCEAN: TerrainMask =
        TerrainMask(TerrainType::Land as u8 | TerrainType::Ocean as u8);

    pub fn from_bits(bits: u8) -> Self {
        TerrainMask(bits & 0b111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, terrain: TerrainType) -> bool {
        self.0 & terrain.bit() != 0
    }

    /// Whether a tile of this terrain may be entered. Impassable tiles never
    /// are, whatever the mask says.
    pub fn allows(self, terrain: TerrainType) -> bool {
        terrain != TerrainType::Impassable && self.contains(terrain)
    }
}

impl From<TerrainType> for TerrainMask {
    fn from(terrain: TerrainType) -> Self {
        TerrainMask(terrain.bit())
    }
}

impl BitOr for TerrainMask {
    type Output = TerrainMask;

    fn bitor(self, rhs: TerrainMask) -> TerrainMask {
        TerrainMask(self.0 | rhs.0)
    }
}

impl BitOr for TerrainType {
    type Output = TerrainMask;

    fn bitor(self, rhs: TerrainType) -> TerrainMask {
        TerrainMask(self.bit() | rhs.bit())
    }
}

impl BitOr<TerrainType> for TerrainMask {
    type Output = TerrainMask;

    fn bitor(self, rhs: TerrainType) -> TerrainMask {
        TerrainMask(self.0 | rhs.bit())
    }
}

/// Row/column address of a tile. Ordering is row-major and is the
/// tie-breaker wherever tiles compete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub row: u32,
    pub col: u32,
}

impl GridIndex {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainTile {
    pub index: GridIndex,
    pub center: GeoPoint,
    pub terrain: TerrainType,
}

/// Terrain layer over the hexagonal tiling. Read-only during searches.
#[derive(Debug, Clone)]
pub struct GridModel {
    config: GridConfig,
    rows: u32,
    cols: u32,
    lat_step: f64,
    lon_step: f64,
    terrain: Vec<TerrainType>,
}

impl GridModel {
    /// Build a grid where every tile has the same terrain.
    pub fn uniform(config: GridConfig, terrain: TerrainType) -> Result<Self, GridError> {
        Self::from_fn(config, |_| terrain)
    }

    /// Build a grid by classifying every tile center.
    pub fn from_fn<F>(config: GridConfig, classify: F) -> Result<Self, GridError>
    where
        F: Fn(&GeoPoint) -> TerrainType,
    {
        validate_config(&config)?;

        let rows = ((180.0 / config.cell_size_deg).round() as u32).max(2);
        let mut cols = ((360.0 / config.cell_size_deg).round() as u32).max(2);
        if cols % 2 == 1 {
            cols = cols.saturating_add(1);
        }
        let tile_count = u64::from(rows)
            .checked_mul(u64::from(cols))
            .filter(|count| *count <= MAX_TILE_COUNT)
            .ok_or_else(|| {
                GridError::InvalidConfig(format!(
                    "cell size {} degrees needs {rows} x {cols} tiles, more than {MAX_TILE_COUNT}",
                    config.cell_size_deg
                ))
            })?;

        let mut grid = Self {
            config,
            rows,
            cols,
            lat_step: 180.0 / rows as f64,
            lon_step: 360.0 / cols as f64,
            terrain: Vec::with_capacity(tile_count as usize),
        };
        for row in 0..rows {
            for col in 0..cols {
                let center = grid.center_of(GridIndex::new(row, col));
                grid.terrain.push(classify(&center));
            }
        }
        Ok(grid)
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn body_radius_m(&self) -> f64 {
        self.config.body_radius_m
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn tile_count(&self) -> usize {
        self.terrain.len()
    }

    pub fn contains(&self, index: GridIndex) -> bool {
        index.row < self.rows && index.col < self.cols
    }

    pub fn tile(&self, index: GridIndex) -> Result<TerrainTile, GridError> {
        if !self.contains(index) {
            return Err(GridError::IndexOutOfRange {
                row: index.row,
                col: index.col,
            });
        }
        Ok(self.tile_at(index))
    }

    pub fn set_terrain(&mut self, index: GridIndex, terrain: TerrainType) -> Result<(), GridError> {
        if !self.contains(index) {
            return Err(GridError::IndexOutOfRange {
                row: index.row,
                col: index.col,
            });
        }
        let slot = self.slot(index);
        self.terrain[slot] = terrain;
        Ok(())
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TerrainTile> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.cols).map(move |col| GridIndex::new(row, col)))
            .map(move |index| self.tile_at(index))
    }

    /// Tile whose center is closest to `point` on the great circle.
    pub fn nearest_tile(&self, point: &GeoPoint) -> TerrainTile {
        let row_f = (point.lat() + 90.0) / self.lat_step - 0.5;
        let center_row = (row_f.round() as i64).clamp(0, self.rows as i64 - 1);
        let radius = self.config.body_radius_m;

        let mut best: Option<(f64, GridIndex)> = None;
        for row in (center_row - 1)..=(center_row + 1) {
            if row < 0 || row >= self.rows as i64 {
                continue;
            }
            let row = row as u32;
            let col_f = (point.lon() + 180.0) / self.lon_step - row_offset(row);
            let floor = col_f.floor() as i64;
            for col in [floor, floor + 1] {
                let index = GridIndex::new(row, self.wrap_col(col));
                let distance = self.center_of(index).distance_to(point, radius);
                let better = match best {
                    None => true,
                    Some((best_distance, best_index)) => match distance.total_cmp(&best_distance) {
                        Ordering::Less => true,
                        Ordering::Equal => index < best_index,
                        Ordering::Greater => false,
                    },
                };
                if better {
                    best = Some((distance, index));
                }
            }
        }

        // the candidate rows are never empty, the fallback only keeps this total
        let index = best.map(|(_, index)| index).unwrap_or(GridIndex::new(0, 0));
        self.tile_at(index)
    }

    /// The six tiles adjacent to `tile`, always in the same order: west,
    /// east, the two tiles towards the south pole, the two towards the north
    /// pole.
    pub fn neighbors(&self, tile: &TerrainTile) -> Vec<TerrainTile> {
        self.neighbor_indices(tile.index)
            .into_iter()
            .map(|index| self.tile_at(index))
            .collect()
    }

    pub(crate) fn neighbor_indices(&self, index: GridIndex) -> [GridIndex; 6] {
        let row = index.row as i64;
        let col = index.col as i64;
        // odd-r layout: diagonal neighbors of an odd row sit one column further east
        let (diag_west, diag_east) = if index.row % 2 == 1 {
            (col, col + 1)
        } else {
            (col - 1, col)
        };

        [
            GridIndex::new(index.row, self.wrap_col(col - 1)),
            GridIndex::new(index.row, self.wrap_col(col + 1)),
            self.vertical_neighbor(row - 1, index.row, col, diag_west, -1),
            self.vertical_neighbor(row - 1, index.row, col, diag_east, 1),
            self.vertical_neighbor(row + 1, index.row, col, diag_west, -1),
            self.vertical_neighbor(row + 1, index.row, col, diag_east, 1),
        ]
    }

    fn vertical_neighbor(
        &self,
        target_row: i64,
        row: u32,
        col: i64,
        diag_col: i64,
        side: i64,
    ) -> GridIndex {
        if target_row >= 0 && target_row < self.rows as i64 {
            return GridIndex::new(target_row as u32, self.wrap_col(diag_col));
        }
        // across the pole: the two tiles straddling the antipodal column of the same row
        let antipode = col + self.cols as i64 / 2;
        GridIndex::new(row, self.wrap_col(antipode + side))
    }

    fn center_of(&self, index: GridIndex) -> GeoPoint {
        let lat = -90.0 + (index.row as f64 + 0.5) * self.lat_step;
        let lon = -180.0 + (index.col as f64 + row_offset(index.row)) * self.lon_step;
        GeoPoint::new(lat, lon)
    }

    /// Caller guarantees `index` lies inside the grid.
    pub(crate) fn tile_at(&self, index: GridIndex) -> TerrainTile {
        TerrainTile {
            index,
            center: self.center_of(index),
            terrain: self.terrain[self.slot(index)],
        }
    }

    fn slot(&self, index: GridIndex) -> usize {
        index.row as usize * self.cols as usize + index.col as usize
    }

    fn wrap_col(&self, col: i64) -> u32 {
        col.rem_euclid(self.cols as i64) as u32
    }
}

fn row_offset(row: u32) -> f64 {
    if row % 2 == 1 {
        0.5
    } else {
        0.0
    }
}

fn validate_config(config: &GridConfig) -> Result<(), GridError> {
    if !config.cell_size_deg.is_finite()
        || config.cell_size_deg <= 0.0
        || config.cell_size_deg > MAX_CELL_SIZE_DEG
    {
        return Err(GridError::InvalidConfig(format!(
            "cell size must be in (0, {MAX_CELL_SIZE_DEG}] degrees, got {}",
            config.cell_size_deg
        )));
    }
    if !config.body_radius_m.is_finite() || config.body_radius_m <= 0.0 {
        return Err(GridError::InvalidConfig(format!(
            "body radius must be positive, got {}",
            config.body_radius_m
        )));
    }
    Ok(())
}
