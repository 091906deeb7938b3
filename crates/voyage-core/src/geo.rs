//! Spherical geometry for surface points and great-circle distances.
//!
//! Every distance in this crate is measured on a sphere whose radius is
//! supplied by the caller, so the same code serves any body.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Mean radius of Earth, used as the default body radius.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on a body's surface in decimal degrees.
///
/// Latitude is clamped to [-90, 90] and longitude wrapped into [-180, 180)
/// at construction; the fields cannot be changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGeoPoint", into = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lon: f64,
}

impl From<RawGeoPoint> for GeoPoint {
    fn from(raw: RawGeoPoint) -> Self {
        GeoPoint::new(raw.lat, raw.lon)
    }
}

impl From<GeoPoint> for RawGeoPoint {
    fn from(point: GeoPoint) -> Self {
        RawGeoPoint {
            lat: point.lat,
            lon: point.lon,
        }
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: if lat.is_finite() { lat.clamp(-90.0, 90.0) } else { 0.0 },
            lon: wrap_longitude(lon),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Great-circle distance to `other` in meters on a sphere of `radius_m`.
    pub fn distance_to(&self, other: &GeoPoint, radius_m: f64) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon, radius_m)
    }

    /// Initial bearing towards `other` in radians (0 = north, π/2 = east).
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        bearing(self.lat, self.lon, other.lat, other.lon)
    }

    /// Point reached after travelling `distance_m` along the great circle
    /// towards `other`.
    pub fn towards(&self, other: &GeoPoint, distance_m: f64, radius_m: f64) -> GeoPoint {
        let heading = self.bearing_to(other);
        let (lat, lon) = offset_by_bearing(self.lat, self.lon, distance_m, heading, radius_m);
        GeoPoint::new(lat, lon)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// Wrap a longitude in degrees into [-180, 180).
pub fn wrap_longitude(lon: f64) -> f64 {
    if !lon.is_finite() {
        return 0.0;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Calculate distance between two points in meters using the haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
/// * `radius_m` - Radius of the body
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius_m: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * radius_m * a.sqrt().atan2((1.0 - a).max(0.0).sqrt())
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(
    lat: f64,
    lon: f64,
    distance_m: f64,
    bearing_rad: f64,
    radius_m: f64,
) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON || radius_m <= 0.0 {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / radius_m;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 = (lon2 + PI).rem_euclid(2.0 * PI) - PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0, EARTH_RADIUS_M);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_scales_with_radius() {
        let earth = haversine_distance(0.0, 0.0, 0.0, 10.0, EARTH_RADIUS_M);
        let small = haversine_distance(0.0, 0.0, 0.0, 10.0, 600_000.0);
        assert!((earth / small - EARTH_RADIUS_M / 600_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_longitude_wraps_into_half_open_range() {
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert!((wrap_longitude(190.0) - -170.0).abs() < 1e-12);
        assert!((wrap_longitude(-540.5) - 179.5).abs() < 1e-12);
        assert_eq!(wrap_longitude(f64::NAN), 0.0);
    }

    #[test]
    fn test_point_clamps_latitude() {
        let point = GeoPoint::new(95.0, 370.0);
        assert_eq!(point.lat(), 90.0);
        assert!((point.lon() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_towards_lands_on_great_circle() {
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 10.0);
        let total = start.distance_to(&end, EARTH_RADIUS_M);
        let mid = start.towards(&end, total / 2.0, EARTH_RADIUS_M);
        assert!(mid.lat().abs() < 1e-9, "expected equator, got {mid}");
        assert!((mid.lon() - 5.0).abs() < 1e-9, "expected lon 5, got {mid}");
    }
}
