//! Compact text encoding of routes for inline persisted storage.
//!
//! An encoded route is `<distance>:<polyline>`. The distance is in meters
//! with three decimals. The polyline is the precision-5 signed-varint delta
//! encoding of the (lat, lon) pairs, using only the printable characters
//! `?` through `~`. Nothing here depends on the host locale.

use crate::geo::GeoPoint;
use crate::grid::TerrainTile;
use crate::models::{polyline_length, Route};
use thiserror::Error;

const PRECISION: f64 = 1e5;
const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: u64 = 0x1f;
const CONTINUE_BIT: u64 = 0x20;
const ALPHABET_START: u8 = 63;
const ALPHABET_END: u8 = 126;
const MAX_SHIFT: u32 = 60;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("malformed route encoding: {0}")]
    MalformedRoute(String),
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::MalformedRoute(reason.into())
}

/// Encode a route for storage.
pub fn encode(route: &Route) -> String {
    let mut out = format!("{:.3}:", route.distance_m());
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;
    for point in route.waypoints() {
        let lat = to_fixed(point.lat());
        let lon = lon_to_fixed(point.lon());
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }
    out
}

/// Decode a stored route. Any defect rejects the whole string.
pub fn decode(encoded: &str) -> Result<Route, CodecError> {
    let (distance_part, polyline) = encoded
        .split_once(':')
        .ok_or_else(|| malformed("missing distance separator"))?;

    let distance_m: f64 = distance_part
        .trim()
        .parse()
        .map_err(|_| malformed(format!("bad distance {distance_part:?}")))?;
    if !distance_m.is_finite() || distance_m < 0.0 {
        return Err(malformed(format!("distance out of range: {distance_m}")));
    }

    let values = decode_values(polyline)?;
    if values.len() % 2 != 0 {
        return Err(malformed("odd number of coordinates"));
    }

    let mut waypoints = Vec::with_capacity(values.len() / 2);
    let mut lat = 0i64;
    let mut lon = 0i64;
    for pair in values.chunks_exact(2) {
        lat = lat
            .checked_add(pair[0])
            .ok_or_else(|| malformed("latitude overflow"))?;
        lon = lon
            .checked_add(pair[1])
            .ok_or_else(|| malformed("longitude overflow"))?;
        let lat_deg = lat as f64 / PRECISION;
        let lon_deg = lon as f64 / PRECISION;
        if !(-90.0..=90.0).contains(&lat_deg) {
            return Err(malformed(format!("latitude {lat_deg} out of range")));
        }
        if !(-180.0..=180.0).contains(&lon_deg) {
            return Err(malformed(format!("longitude {lon_deg} out of range")));
        }
        waypoints.push(GeoPoint::new(lat_deg, lon_deg));
    }

    if waypoints.len() < 2 {
        return Err(malformed(format!(
            "a route needs at least 2 waypoints, found {}",
            waypoints.len()
        )));
    }

    Ok(Route::new(waypoints, distance_m))
}

/// Adapt raw search output into waypoint form. The distance is the length
/// of the path through the tile centers.
pub fn tiles_to_waypoints(tiles: &[TerrainTile], radius_m: f64) -> Route {
    let waypoints: Vec<GeoPoint> = tiles.iter().map(|tile| tile.center).collect();
    let distance_m = polyline_length(&waypoints, radius_m);
    Route::new(waypoints, distance_m)
}

fn to_fixed(degrees: f64) -> i64 {
    (degrees * PRECISION).round() as i64
}

/// Longitudes within rounding of +180 are stored as -180 so every encoded
/// longitude stays in [-180, 180).
fn lon_to_fixed(degrees: f64) -> i64 {
    let fixed = to_fixed(degrees);
    let half_turn = to_fixed(180.0);
    if fixed >= half_turn {
        fixed - 2 * half_turn
    } else {
        fixed
    }
}

fn encode_value(value: i64, out: &mut String) {
    let mut bits = if value < 0 {
        !((value as u64) << 1)
    } else {
        (value as u64) << 1
    };
    while bits >= CONTINUE_BIT {
        out.push(char::from(((CONTINUE_BIT | (bits & CHUNK_MASK)) as u8) + ALPHABET_START));
        bits >>= CHUNK_BITS;
    }
    out.push(char::from((bits as u8) + ALPHABET_START));
}

fn decode_values(polyline: &str) -> Result<Vec<i64>, CodecError> {
    let mut values = Vec::new();
    let mut accumulated = 0u64;
    let mut shift = 0u32;
    let mut in_value = false;

    for (position, byte) in polyline.bytes().enumerate() {
        if !(ALPHABET_START..=ALPHABET_END).contains(&byte) {
            return Err(malformed(format!(
                "invalid character {:?} at position {position}",
                char::from(byte)
            )));
        }
        if shift > MAX_SHIFT {
            return Err(malformed(format!("value too long at position {position}")));
        }
        let chunk = u64::from(byte - ALPHABET_START);
        accumulated |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        in_value = true;

        if chunk & CONTINUE_BIT == 0 {
            let value = if accumulated & 1 == 1 {
                !(accumulated >> 1) as i64
            } else {
                (accumulated >> 1) as i64
            };
            values.push(value);
            accumulated = 0;
            shift = 0;
            in_value = false;
        }
    }

    if in_value {
        return Err(malformed("truncated coordinate at end of input"));
    }
    Ok(values)
}
