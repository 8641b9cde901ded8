//! Geographic coordinate type shared by the geometry and sampling stages.
//! All coordinate math uses f64 for precision.

use serde::{Deserialize, Serialize};

use crate::sphere::Vec3;

/// Quantization step for cache keys and seeds: 1e-7° ≈ 1 cm at the equator.
pub const QUANTUM_DEG: f64 = 1e-7;

/// A point on the sphere in geographic coordinates (WGS84 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a GeoJSON position, which is ordered `[lon, lat]`.
    pub fn from_lon_lat(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    /// Convert to radians.
    pub fn to_radians(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lon.to_radians())
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::from_latlon(self.lat, self.lon)
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// True when both components lie in the valid WGS84 ranges.
    pub fn in_bounds(self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Integer grid representation at `QUANTUM_DEG` resolution, as (lon, lat).
    pub fn quantized(self) -> (i64, i64) {
        (
            (self.lon / QUANTUM_DEG).round() as i64,
            (self.lat / QUANTUM_DEG).round() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert!(LatLon::new(90.0, 180.0).in_bounds());
        assert!(LatLon::new(-90.0, -180.0).in_bounds());
        assert!(!LatLon::new(90.0001, 0.0).in_bounds());
        assert!(!LatLon::new(0.0, -180.5).in_bounds());
    }

    #[test]
    fn quantization_absorbs_float_noise() {
        let a = LatLon::from_lon_lat(-6.0, 37.5);
        let b = LatLon::from_lon_lat(-6.0 + 1e-12, 37.5 - 1e-12);
        assert_eq!(a.quantized(), b.quantized());
    }

    #[test]
    fn nan_is_not_finite() {
        assert!(!LatLon::new(f64::NAN, 0.0).is_finite());
        assert!(!LatLon::new(0.0, f64::INFINITY).is_finite());
    }
}
