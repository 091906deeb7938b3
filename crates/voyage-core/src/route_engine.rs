//! Route engine: A* search over the terrain grid.
//!
//! Edge costs are great-circle distances between tile centers and the
//! heuristic is the great-circle distance to the target center, so the
//! search returns a minimum-distance path. Frontier ties are broken by
//! g-score and then grid index, which makes every search reproducible.

use crate::codec::tiles_to_waypoints;
use crate::geo::GeoPoint;
use crate::grid::{GridIndex, GridModel, TerrainMask, TerrainTile};
use crate::models::Route;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("no traversable path from tile {start} to tile {target}")]
    NoPathFound { start: GridIndex, target: GridIndex },
    #[error("origin and destination are the same point")]
    AlreadyAtDestination,
    #[error("search gave up after expanding {expanded} tiles")]
    SearchLimitExceeded { expanded: usize },
}

/// Bounds on a single search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub max_expanded_nodes: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_expanded_nodes: 2_000_000,
        }
    }
}

/// Successful search output.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Origin, every tile center on the path, destination
    pub route: Route,
    /// Tiles the path crosses, start tile first
    pub tiles: Vec<TerrainTile>,
    pub nodes_visited: usize,
}

impl PathResult {
    pub fn distance_m(&self) -> f64 {
        self.route.distance_m()
    }
}

/// Numeric view of a search outcome: the route distance, or 0 when the
/// search failed.
pub fn outcome_distance(outcome: &Result<PathResult, RouteError>) -> f64 {
    outcome.as_ref().map(PathResult::distance_m).unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    index: GridIndex,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Find the shortest traversable route between two surface points.
pub fn find_path(
    origin: &GeoPoint,
    destination: &GeoPoint,
    grid: &GridModel,
    allowed: TerrainMask,
) -> Result<PathResult, RouteError> {
    find_path_with_limits(origin, destination, grid, allowed, &SearchLimits::default())
}

pub fn find_path_with_limits(
    origin: &GeoPoint,
    destination: &GeoPoint,
    grid: &GridModel,
    allowed: TerrainMask,
    limits: &SearchLimits,
) -> Result<PathResult, RouteError> {
    let radius = grid.body_radius_m();
    if origin.distance_to(destination, radius) <= f64::EPSILON {
        return Err(RouteError::AlreadyAtDestination);
    }

    let start = grid.nearest_tile(origin);
    let target = grid.nearest_tile(destination);
    let no_path = RouteError::NoPathFound {
        start: start.index,
        target: target.index,
    };

    if !allowed.allows(start.terrain) || !allowed.allows(target.terrain) {
        tracing::debug!(
            start = %start.index,
            target = %target.index,
            "route endpoint lies on terrain outside the allowed mask"
        );
        return Err(no_path);
    }

    let (tiles, nodes_visited) = search_tiles(grid, &start, &target, allowed, limits)?
        .ok_or(no_path)?;

    let core = tiles_to_waypoints(&tiles, radius);
    let (Some(first), Some(last)) = (core.origin(), core.destination()) else {
        return Err(RouteError::NoPathFound {
            start: start.index,
            target: target.index,
        });
    };
    let distance_m = origin.distance_to(first, radius)
        + core.distance_m()
        + last.distance_to(destination, radius);

    let mut waypoints = Vec::with_capacity(core.len() + 2);
    waypoints.push(*origin);
    waypoints.extend_from_slice(core.waypoints());
    waypoints.push(*destination);

    tracing::debug!(
        tiles = tiles.len(),
        nodes_visited,
        distance_m,
        "route search succeeded"
    );

    Ok(PathResult {
        route: Route::new(waypoints, distance_m),
        tiles,
        nodes_visited,
    })
}

/// A* over tile indices. `Ok(None)` means the frontier emptied without
/// reaching the target.
fn search_tiles(
    grid: &GridModel,
    start: &TerrainTile,
    target: &TerrainTile,
    allowed: TerrainMask,
    limits: &SearchLimits,
) -> Result<Option<(Vec<TerrainTile>, usize)>, RouteError> {
    let radius = grid.body_radius_m();
    let heuristic = |tile: &TerrainTile| tile.center.distance_to(&target.center, radius);

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut closed_set: HashSet<GridIndex> = HashSet::new();
    let mut g_score: HashMap<GridIndex, f64> = HashMap::new();
    let mut came_from: HashMap<GridIndex, GridIndex> = HashMap::new();

    g_score.insert(start.index, 0.0);
    open_set.push(Reverse(OpenNode {
        index: start.index,
        g_score: FloatOrd(0.0),
        f_score: FloatOrd(heuristic(start)),
    }));

    let mut nodes_visited = 0usize;
    let mut reached = false;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.index) {
            continue;
        }
        let best_g = g_score.get(&current.index).copied().unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g {
            continue;
        }

        nodes_visited += 1;
        if current.index == target.index {
            reached = true;
            break;
        }
        if nodes_visited >= limits.max_expanded_nodes {
            tracing::warn!(nodes_visited, "route search hit its expansion limit");
            return Err(RouteError::SearchLimitExceeded {
                expanded: nodes_visited,
            });
        }

        closed_set.insert(current.index);
        let current_tile = grid.tile_at(current.index);

        for neighbor in grid.neighbors(&current_tile) {
            if closed_set.contains(&neighbor.index) || !allowed.allows(neighbor.terrain) {
                continue;
            }
            let step = current_tile.center.distance_to(&neighbor.center, radius);
            let tentative_g = best_g + step;
            let known = g_score.get(&neighbor.index).copied().unwrap_or(f64::INFINITY);
            if tentative_g < known {
                came_from.insert(neighbor.index, current.index);
                g_score.insert(neighbor.index, tentative_g);
                open_set.push(Reverse(OpenNode {
                    index: neighbor.index,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + heuristic(&neighbor)),
                }));
            }
        }
    }

    if !reached {
        return Ok(None);
    }

    let mut path = vec![target.index];
    let mut cursor = target.index;
    while let Some(previous) = came_from.get(&cursor) {
        path.push(*previous);
        cursor = *previous;
    }
    path.reverse();

    let tiles = path.into_iter().map(|index| grid.tile_at(index)).collect();
    Ok(Some((tiles, nodes_visited)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridConfig, TerrainType};

    fn grid(cell_size_deg: f64) -> GridModel {
        let config = GridConfig {
            cell_size_deg,
            ..GridConfig::default()
        };
        GridModel::uniform(config, TerrainType::Land).unwrap()
    }

    #[test]
    fn equator_route_matches_great_circle() {
        let grid = grid(1.0);
        let origin = GeoPoint::new(0.0, 0.0);
        let destination = GeoPoint::new(0.0, 10.0);

        let result = find_path(&origin, &destination, &grid, TerrainMask::LAND_OR_OCEAN).unwrap();
        let direct = origin.distance_to(&destination, grid.body_radius_m());
        let cell_m = GeoPoint::new(0.0, 0.0).distance_to(&GeoPoint::new(0.0, 1.0), grid.body_radius_m());

        assert!(result.route.len() >= 2);
        assert_eq!(result.route.origin(), Some(&origin));
        assert_eq!(result.route.destination(), Some(&destination));
        assert!(result.distance_m() >= direct - 1.0);
        // endpoints snap to tile centers, which costs at most about a cell
        assert!(
            result.distance_m() < direct + 2.0 * cell_m,
            "route {} vs direct {}",
            result.distance_m(),
            direct
        );
    }

    #[test]
    fn same_point_is_reported() {
        let grid = grid(5.0);
        let point = GeoPoint::new(12.0, 34.0);
        assert_eq!(
            find_path(&point, &point, &grid, TerrainMask::LAND),
            Err(RouteError::AlreadyAtDestination)
        );
    }

    #[test]
    fn same_tile_route_goes_through_its_center() {
        let grid = grid(5.0);
        let origin = GeoPoint::new(0.1, 0.1);
        let destination = GeoPoint::new(0.2, 0.3);
        let result = find_path(&origin, &destination, &grid, TerrainMask::LAND).unwrap();
        assert_eq!(result.tiles.len(), 1);
        assert_eq!(result.route.len(), 3);
        assert!(result.distance_m() > 0.0);
    }

    #[test]
    fn blocked_endpoint_fails_with_zero_distance() {
        let grid = grid(5.0);
        let outcome = find_path(
            &GeoPoint::new(0.0, 0.0),
            &GeoPoint::new(0.0, 20.0),
            &grid,
            TerrainMask::OCEAN,
        );
        assert!(matches!(outcome, Err(RouteError::NoPathFound { .. })));
        assert_eq!(outcome_distance(&outcome), 0.0);
    }

    #[test]
    fn limit_stops_long_searches() {
        let grid = grid(1.0);
        let limits = SearchLimits {
            max_expanded_nodes: 3,
        };
        let outcome = find_path_with_limits(
            &GeoPoint::new(0.0, 0.0),
            &GeoPoint::new(0.0, 40.0),
            &grid,
            TerrainMask::LAND,
            &limits,
        );
        assert_eq!(outcome, Err(RouteError::SearchLimitExceeded { expanded: 3 }));
    }
}
