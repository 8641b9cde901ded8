//! Spherical geometry for polygon validation and area.
//! Unit-sphere vector math in f64; areas scaled by the mean Earth radius.

/// IUGG mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A point on the unit sphere in Cartesian coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_latlon(lat_deg: f64, lon_deg: f64) -> Self {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();
        Self {
            x: lat.cos() * lon.cos(),
            y: lat.cos() * lon.sin(),
            z: lat.sin(),
        }
    }

    pub fn to_latlon(self) -> (f64, f64) {
        let lat = self.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = self.y.atan2(self.x).to_degrees();
        (lat, lon)
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(self) -> Self {
        let len = self.length();
        Self { x: self.x / len, y: self.y / len, z: self.z / len }
    }
}

/// Great-circle distance between two unit vectors in radians.
pub fn great_circle_distance_rad(a: Vec3, b: Vec3) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Great-circle distance in kilometres between two (lat, lon) points.
pub fn great_circle_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let a = Vec3::from_latlon(lat1, lon1);
    let b = Vec3::from_latlon(lat2, lon2);
    great_circle_distance_rad(a, b) * EARTH_RADIUS_KM
}

/// Find an intersection of two great-circle arcs on the unit sphere.
/// Returns a point that lies within both arcs, or `None` if they do not
/// intersect. Degenerate (zero-length) arcs never intersect.
pub fn arc_intersection(a1: Vec3, a2: Vec3, b1: Vec3, b2: Vec3) -> Option<Vec3> {
    let na_raw = a1.cross(a2);
    let nb_raw = b1.cross(b2);
    if na_raw.length() < 1e-15 || nb_raw.length() < 1e-15 {
        return None;
    }
    let i_raw = na_raw.normalize().cross(nb_raw.normalize());
    if i_raw.length() < 1e-12 {
        return None; // same or antipodal great circle
    }
    let i = i_raw.normalize();
    let neg_i = Vec3 { x: -i.x, y: -i.y, z: -i.z };

    let arc_a_len = great_circle_distance_rad(a1, a2);
    let arc_b_len = great_circle_distance_rad(b1, b2);

    for candidate in [i, neg_i] {
        let on_a = (great_circle_distance_rad(a1, candidate)
            + great_circle_distance_rad(candidate, a2)
            - arc_a_len)
            .abs()
            < 1e-9;
        if !on_a {
            continue;
        }
        let on_b = (great_circle_distance_rad(b1, candidate)
            + great_circle_distance_rad(candidate, b2)
            - arc_b_len)
            .abs()
            < 1e-9;
        if on_b {
            return Some(candidate);
        }
    }
    None
}

/// Signed spherical area of a closed (lat, lon) ring in km².
///
/// Uses the equal-area ring formula
/// `A = R²/2 · Σ Δλᵢ · (2 + sin φᵢ + sin φᵢ₊₁)`, which is exact for edges
/// along parallels and accurate to well under 0.1 % for sub-continental
/// polygons. Longitude steps are wrapped into (-180°, 180°] so rings that
/// cross the antimeridian keep their true extent. Positive for
/// clockwise rings (as seen from outside the sphere) in this convention;
/// callers take `abs()`.
pub fn ring_area_signed_km2(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0_f64;
    for i in 0..n {
        let (lat1, lon1) = ring[i];
        let (lat2, lon2) = ring[(i + 1) % n];
        let mut dlon = lon2 - lon1;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon <= -180.0 {
            dlon += 360.0;
        }
        sum += dlon.to_radians()
            * (2.0 + lat1.to_radians().sin() + lat2.to_radians().sin());
    }
    sum * EARTH_RADIUS_KM * EARTH_RADIUS_KM / 2.0
}
