//! Polygon validation, geodesic area, centroid and point containment.
//!
//! Validation order: point count → coordinate bounds → closure →
//! distinct vertices → pole winding → self-intersection → area →
//! area policy limits.
//! The first failing check decides the error.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::coords::LatLon;
use crate::error::AnalysisError;
use crate::sphere::{arc_intersection, ring_area_signed_km2};

/// Closure tolerance between first and last ring positions, in degrees.
const CLOSURE_TOLERANCE_DEG: f64 = 1e-9;

/// Rings whose area is below this are treated as collinear / degenerate.
const DEGENERATE_AREA_KM2: f64 = 1e-9;

/// Above this many vertices the O(n²) self-intersection check is skipped.
const MAX_INTERSECTION_CHECK_VERTICES: usize = 2048;

/// Optional policy bounds on polygon area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AreaLimits {
    /// Reject polygons smaller than this (km²). `None` disables the check.
    pub min_km2: Option<f64>,
    /// Reject polygons larger than this (km²). `None` disables the check.
    pub max_km2: Option<f64>,
}

impl Default for AreaLimits {
    fn default() -> Self {
        Self { min_km2: Some(0.001), max_km2: Some(100_000.0) }
    }
}

impl AreaLimits {
    pub fn unbounded() -> Self {
        Self { min_km2: None, max_km2: None }
    }
}

/// Axis-aligned extent in (possibly unwrapped) degrees.
/// `max_lon` may exceed 180 for rings that cross the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn width_deg(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// A ring that passed every validation check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPolygon {
    /// Open ring (closing point removed, consecutive duplicates removed) with
    /// longitudes unwrapped to be continuous from the first vertex.
    vertices: Vec<LatLon>,
    area_km2: f64,
    centroid: LatLon,
    bbox: BoundingBox,
}

impl ValidPolygon {
    pub fn vertices(&self) -> &[LatLon] {
        &self.vertices
    }

    pub fn area_km2(&self) -> f64 {
        self.area_km2
    }

    /// Vertex-mean centroid, longitude wrapped back into [-180, 180].
    pub fn centroid(&self) -> LatLon {
        self.centroid
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Even-odd point-in-polygon test in the unwrapped lon/lat plane.
    pub fn contains(&self, p: LatLon) -> bool {
        let lon = unwrap_near(p.lon, (self.bbox.min_lon + self.bbox.max_lon) / 2.0);
        let lat = p.lat;
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (yi, xi) = (self.vertices[i].lat, self.vertices[i].lon);
            let (yj, xj) = (self.vertices[j].lat, self.vertices[j].lon);
            if (yi > lat) != (yj > lat) {
                let x_cross = xj + (lat - yj) / (yi - yj) * (xi - xj);
                if lon < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Canonical vertex list for cache keys and seeds: counter-clockwise,
    /// rotated to start at the smallest quantized vertex, quantized to 1e-7°.
    /// Two rings describing the same polygon map to the same key regardless
    /// of starting vertex or orientation.
    pub fn normalized_key(&self) -> Vec<(i64, i64)> {
        let mut pts: Vec<(i64, i64)> = self
            .vertices
            .iter()
            .map(|v| LatLon::new(v.lat, wrap_lon(v.lon)).quantized())
            .collect();
        if signed_area(&self.vertices) > 0.0 {
            pts.reverse();
        }
        let start = pts
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| **p)
            .map(|(i, _)| i)
            .unwrap_or(0);
        pts.rotate_left(start);
        pts
    }
}

/// Validate a closed (lat, lon) ring and compute its geodesic area.
pub fn validate_polygon(ring: &[LatLon], limits: &AreaLimits) -> Result<ValidPolygon, AnalysisError> {
    if ring.len() < 4 {
        return Err(AnalysisError::InvalidGeometry(format!(
            "ring needs at least 4 positions (closed triangle), got {}",
            ring.len()
        )));
    }

    for (i, p) in ring.iter().enumerate() {
        if !p.is_finite() || !p.in_bounds() {
            return Err(AnalysisError::InvalidGeometry(format!(
                "position {i} (lon {}, lat {}) is outside -180..180 / -90..90",
                p.lon, p.lat
            )));
        }
    }

    let first = ring[0];
    let last = ring[ring.len() - 1];
    if (first.lat - last.lat).abs() > CLOSURE_TOLERANCE_DEG
        || (first.lon - last.lon).abs() > CLOSURE_TOLERANCE_DEG
    {
        return Err(AnalysisError::InvalidGeometry(
            "ring is not closed: first position must equal the last".into(),
        ));
    }

    // Open ring without consecutive duplicates.
    let mut open: Vec<LatLon> = Vec::with_capacity(ring.len() - 1);
    for &p in &ring[..ring.len() - 1] {
        if open.last().map_or(true, |q| q.quantized() != p.quantized()) {
            open.push(p);
        }
    }
    while open.len() > 1 && open[0].quantized() == open[open.len() - 1].quantized() {
        open.pop();
    }
    if open.len() < 3 {
        return Err(AnalysisError::InvalidGeometry(format!(
            "ring has {} distinct vertices, at least 3 required",
            open.len()
        )));
    }

    let vertices = unwrap_ring(&open);

    // The unwrapped closing edge returns to the first vertex only if the ring
    // does not wind around a pole.
    let winding = unwrap_near(vertices[0].lon, vertices[vertices.len() - 1].lon) - vertices[0].lon;
    if winding.abs() > 180.0 {
        return Err(AnalysisError::InvalidGeometry(
            "pole-enclosing rings are not supported".into(),
        ));
    }

    check_self_intersection(&vertices)?;

    let area_km2 = signed_area(&vertices).abs();
    if area_km2 < DEGENERATE_AREA_KM2 {
        return Err(AnalysisError::InvalidGeometry(
            "ring is degenerate (zero area)".into(),
        ));
    }
    if let Some(max_km2) = limits.max_km2 {
        if area_km2 > max_km2 {
            return Err(AnalysisError::AreaTooLarge { area_km2, max_km2 });
        }
    }
    if let Some(min_km2) = limits.min_km2 {
        if area_km2 < min_km2 {
            return Err(AnalysisError::AreaTooSmall { area_km2, min_km2 });
        }
    }

    let n = vertices.len() as f64;
    let mean_lat = vertices.iter().map(|v| v.lat).sum::<f64>() / n;
    let mean_lon = vertices.iter().map(|v| v.lon).sum::<f64>() / n;
    let centroid = LatLon::new(mean_lat, wrap_lon(mean_lon));

    let bbox = vertices.iter().fold(
        BoundingBox {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        },
        |b, v| BoundingBox {
            min_lat: b.min_lat.min(v.lat),
            max_lat: b.max_lat.max(v.lat),
            min_lon: b.min_lon.min(v.lon),
            max_lon: b.max_lon.max(v.lon),
        },
    );

    debug!(
        "validated polygon: {} vertices, {:.3} km², centroid ({:.4}, {:.4})",
        vertices.len(),
        area_km2,
        centroid.lat,
        centroid.lon
    );

    Ok(ValidPolygon { vertices, area_km2, centroid, bbox })
}

fn check_self_intersection(vertices: &[LatLon]) -> Result<(), AnalysisError> {
    let n = vertices.len();
    if n > MAX_INTERSECTION_CHECK_VERTICES {
        debug!("skipping self-intersection check for {n}-vertex ring");
        return Ok(());
    }
    let pts: Vec<_> = vertices.iter().map(|v| v.to_vec3()).collect();
    for i in 0..n {
        let (a1, a2) = (pts[i], pts[(i + 1) % n]);
        for j in (i + 1)..n {
            // Adjacent edges share a vertex by construction.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (pts[j], pts[(j + 1) % n]);
            if arc_intersection(a1, a2, b1, b2).is_some() {
                return Err(AnalysisError::InvalidGeometry(format!(
                    "ring self-intersects between edges {i} and {j}"
                )));
            }
        }
    }
    Ok(())
}

fn signed_area(vertices: &[LatLon]) -> f64 {
    let ring: Vec<(f64, f64)> = vertices.iter().map(|v| (v.lat, v.lon)).collect();
    ring_area_signed_km2(&ring)
}

/// Make longitudes continuous: each step is wrapped into (-180, 180].
fn unwrap_ring(open: &[LatLon]) -> Vec<LatLon> {
    let mut out = Vec::with_capacity(open.len());
    let mut prev_lon = open[0].lon;
    out.push(open[0]);
    for p in &open[1..] {
        let lon = unwrap_near(p.lon, prev_lon);
        out.push(LatLon::new(p.lat, lon));
        prev_lon = lon;
    }
    out
}

/// Shift `lon` by multiples of 360 so it lies within 180° of `reference`.
fn unwrap_near(lon: f64, reference: f64) -> f64 {
    let mut d = lon - reference;
    while d > 180.0 {
        d -= 360.0;
    }
    while d <= -180.0 {
        d += 360.0;
    }
    reference + d
}

fn wrap_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        unwrap_near(lon, 0.0)
    }
}
