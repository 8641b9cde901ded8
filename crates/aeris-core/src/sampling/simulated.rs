//! Deterministic simulated Sentinel-1 backscatter.
//!
//! The mean σ0 comes from the seasonal model at the polygon centroid plus a
//! small location jitter. Values are drawn on a grid of cells covering the
//! polygon, with a low-frequency Perlin heterogeneity field and Gaussian
//! per-pixel speckle on top.
//!
//! Fixed-seed policy: the RNG seed is a hash of the normalized polygon, the
//! date range and the polarization, so identical requests produce
//! bit-identical samples on every platform (ChaCha8).

use chrono::Datelike;
use log::debug;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{BackscatterSample, CancelFlag, QualityFlag, SampleSource};
use crate::coords::LatLon;
use crate::error::{AnalysisError, ConfigError};
use crate::geometry::ValidPolygon;
use crate::request::{DateRange, Polarization};
use crate::seasonal::SeasonalModel;

/// Bump when the generated values change for an unchanged request.
const SIMULATOR_VERSION: &str = "simulated-v1";

/// Sentinel-1 repeat cycle used to report a nominal scene count.
const REVISIT_DAYS: i64 = 6;

/// Heterogeneity field frequency in cycles per degree (~28 km wavelength).
const HETEROGENEITY_FREQ_PER_DEG: f64 = 4.0;

const HETEROGENEITY_SEED: u32 = 0x5EA5_0A11;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub seasonal: SeasonalModel,
    /// VH mean sits this many dB below VV.
    pub vh_offset_db: f64,
    /// Half-width of the uniform per-location offset (dB).
    pub jitter_db: f64,
    /// Amplitude of the spatial heterogeneity field (dB).
    pub heterogeneity_db: f64,
    pub speckle_sigma_min_db: f64,
    pub speckle_sigma_max_db: f64,
    /// Upper bound on generated grid cells per polygon.
    pub max_cells: usize,
    /// Nominal ground pixel size in metres.
    pub pixel_size_m: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seasonal: SeasonalModel::default(),
            vh_offset_db: 6.0,
            jitter_db: 0.4,
            heterogeneity_db: 0.8,
            speckle_sigma_min_db: 1.5,
            speckle_sigma_max_db: 2.5,
            max_cells: 4096,
            pixel_size_m: 10.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("jitter_db", self.jitter_db),
            ("heterogeneity_db", self.heterogeneity_db),
            ("speckle_sigma_min_db", self.speckle_sigma_min_db),
        ];
        for (name, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::Invalid(format!("simulation.{name} must be >= 0, got {v}")));
            }
        }
        if !(self.speckle_sigma_max_db >= self.speckle_sigma_min_db) || !self.speckle_sigma_max_db.is_finite() {
            return Err(ConfigError::Invalid(
                "simulation.speckle_sigma_max_db must be >= speckle_sigma_min_db".into(),
            ));
        }
        if self.max_cells == 0 {
            return Err(ConfigError::Invalid("simulation.max_cells must be positive".into()));
        }
        if !(self.pixel_size_m > 0.0) {
            return Err(ConfigError::Invalid("simulation.pixel_size_m must be positive".into()));
        }
        if !self.vh_offset_db.is_finite() {
            return Err(ConfigError::Invalid("simulation.vh_offset_db must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedSource {
    config: SimulationConfig,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Expected mean σ0 for the polygon before heterogeneity and speckle.
    pub fn expected_mean_db(&self, centroid: LatLon, date_range: &DateRange, polarization: Polarization) -> f64 {
        let vv = self
            .config
            .seasonal
            .expected_sigma0_db(centroid.lat, date_range.month(), date_range.year());
        match polarization {
            Polarization::Vv => vv,
            Polarization::Vh => vv - self.config.vh_offset_db,
        }
    }
}

impl SampleSource for SimulatedSource {
    fn sample(
        &self,
        polygon: &ValidPolygon,
        date_range: &DateRange,
        polarization: Polarization,
        cancel: &CancelFlag,
    ) -> Result<BackscatterSample, AnalysisError> {
        let cfg = &self.config;
        let seed = request_seed(polygon, date_range, polarization);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let centroid = polygon.centroid();
        let jitter = if cfg.jitter_db > 0.0 { rng.gen_range(-cfg.jitter_db..=cfg.jitter_db) } else { 0.0 };
        let mean_db = self.expected_mean_db(centroid, date_range, polarization) + jitter;
        let sigma = rng.gen_range(cfg.speckle_sigma_min_db..=cfg.speckle_sigma_max_db);

        let nominal_pixels = (polygon.area_km2() * 1e6 / (cfg.pixel_size_m * cfg.pixel_size_m)).round() as u64;
        let cell_budget = (nominal_pixels.max(1) as usize).min(cfg.max_cells);
        let cells = grid_cells(polygon, cell_budget, cancel)?;

        let perlin = Perlin::new(HETEROGENEITY_SEED);
        let values: Vec<f64> = cells
            .iter()
            .map(|c| {
                let field = perlin.get([
                    c.lon * HETEROGENEITY_FREQ_PER_DEG,
                    c.lat * HETEROGENEITY_FREQ_PER_DEG,
                ]);
                mean_db + cfg.heterogeneity_db * field + sigma * standard_normal(&mut rng)
            })
            .collect();

        let scene_count = ((date_range.days() + REVISIT_DAYS - 1) / REVISIT_DAYS) as usize;

        debug!(
            "simulated {} cells for {} px, mean {:.2} dB, speckle σ {:.2} dB, seed {:#018x}",
            values.len(),
            nominal_pixels,
            mean_db,
            sigma,
            seed
        );

        BackscatterSample::new(values, polarization, nominal_pixels, scene_count, QualityFlag::Simulated)
    }

    fn version(&self) -> String {
        SIMULATOR_VERSION.to_string()
    }
}

// ── Grid ─────────────────────────────────────────────────────────────────────

/// Centres of a regular lon/lat grid over the bounding box that fall inside
/// the polygon, north row first. At most `budget` grid cells are laid out;
/// falls back to the centroid when no centre lands inside.
fn grid_cells(polygon: &ValidPolygon, budget: usize, cancel: &CancelFlag) -> Result<Vec<LatLon>, AnalysisError> {
    let bbox = polygon.bbox();
    let mid_lat = (bbox.min_lat + bbox.max_lat) / 2.0;
    // Ground aspect ratio: degrees of longitude shrink with latitude.
    let width = bbox.width_deg() * mid_lat.to_radians().cos().max(1e-6);
    let height = bbox.height_deg().max(1e-12);
    let aspect = (width / height).clamp(1.0 / budget as f64, budget as f64);

    let nx = ((budget as f64 * aspect).sqrt().floor() as usize).clamp(1, budget);
    let ny = (budget / nx).max(1);

    let dlon = bbox.width_deg() / nx as f64;
    let dlat = bbox.height_deg() / ny as f64;

    let mut cells = Vec::with_capacity(nx * ny);
    for r in 0..ny {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Timeout { after_ms: 0 });
        }
        let lat = bbox.max_lat - (r as f64 + 0.5) * dlat;
        for c in 0..nx {
            let p = LatLon::new(lat, bbox.min_lon + (c as f64 + 0.5) * dlon);
            if polygon.contains(p) {
                cells.push(p);
            }
        }
    }
    if cells.is_empty() {
        cells.push(polygon.centroid());
    }
    Ok(cells)
}

// ── Randomness ───────────────────────────────────────────────────────────────

/// Box–Muller standard normal draw.
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    // 1 − [0, 1) keeps u1 away from zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// FNV-1a over the normalized polygon, date range and polarization.
fn request_seed(polygon: &ValidPolygon, date_range: &DateRange, polarization: Polarization) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for (lon, lat) in polygon.normalized_key() {
        h = fnv_mix(h, lon as u64);
        h = fnv_mix(h, lat as u64);
    }
    h = fnv_mix(h, date_range.start().num_days_from_ce() as u64);
    h = fnv_mix(h, date_range.end().num_days_from_ce() as u64);
    fnv_mix(h, polarization as u64)
}

fn fnv_mix(mut h: u64, word: u64) -> u64 {
    for b in word.to_le_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{validate_polygon, AreaLimits};
    use crate::stats::summarize;

    fn square(lon0: f64, lat0: f64, size: f64) -> ValidPolygon {
        let ring = [
            (lon0, lat0),
            (lon0 + size, lat0),
            (lon0 + size, lat0 + size),
            (lon0, lat0 + size),
            (lon0, lat0),
        ]
        .iter()
        .map(|&(lon, lat)| LatLon::from_lon_lat(lon, lat))
        .collect::<Vec<_>>();
        validate_polygon(&ring, &AreaLimits::unbounded()).unwrap()
    }

    fn july_2023() -> DateRange {
        DateRange::parse("2023-07-01", "2023-07-31").unwrap()
    }

    #[test]
    fn identical_requests_are_bit_identical() {
        let src = SimulatedSource::default();
        let poly = square(-6.0, 37.5, 1.0);
        let a = src.sample(&poly, &july_2023(), Polarization::Vv, &CancelFlag::new()).unwrap();
        let b = src.sample(&poly, &july_2023(), Polarization::Vv, &CancelFlag::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_windows_differ() {
        let src = SimulatedSource::default();
        let poly = square(-6.0, 37.5, 1.0);
        let a = src.sample(&poly, &july_2023(), Polarization::Vv, &CancelFlag::new()).unwrap();
        let aug = DateRange::parse("2023-08-01", "2023-08-31").unwrap();
        let b = src.sample(&poly, &aug, Polarization::Vv, &CancelFlag::new()).unwrap();
        assert_ne!(a.values(), b.values());
    }

    #[test]
    fn seville_july_mean_near_model() {
        let src = SimulatedSource::default();
        let s = src
            .sample(&square(-6.0, 37.5, 1.0), &july_2023(), Polarization::Vv, &CancelFlag::new())
            .unwrap();
        let stats = summarize(s.values()).unwrap();
        assert!(
            (-15.0..-13.0).contains(&stats.mean),
            "mean {:.2} dB outside the expected band around −14",
            stats.mean
        );
        assert_eq!(s.quality_flag(), QualityFlag::Simulated);
        assert!(s.values().len() <= 4096);
        assert!(s.values().len() > 3000, "only {} cells for a square", s.values().len());
        // ≈9,800 km² at 10 m pixels.
        assert!(s.pixel_count() > 90_000_000);
        assert_eq!(s.scene_count(), 6);
    }

    #[test]
    fn vh_sits_six_db_below_vv() {
        let src = SimulatedSource::default();
        let poly = square(10.0, 45.0, 0.5);
        let c = poly.centroid();
        let vv = src.expected_mean_db(c, &july_2023(), Polarization::Vv);
        let vh = src.expected_mean_db(c, &july_2023(), Polarization::Vh);
        assert!((vv - vh - 6.0).abs() < 1e-12);
    }

    #[test]
    fn tiny_polygon_still_yields_values() {
        let src = SimulatedSource::default();
        // 0.0001° square at the equator: about one nominal pixel.
        let s = src
            .sample(&square(30.0, 0.0, 0.0001), &july_2023(), Polarization::Vv, &CancelFlag::new())
            .unwrap();
        assert!(!s.values().is_empty());
    }

    #[test]
    fn cancelled_sampling_stops() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = SimulatedSource::default()
            .sample(&square(-6.0, 37.5, 1.0), &july_2023(), Polarization::Vv, &cancel)
            .unwrap_err();
        assert_eq!(err.kind(), "TIMEOUT");
    }

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
        let bad = SimulationConfig { speckle_sigma_max_db: 1.0, ..SimulationConfig::default() };
        assert!(bad.validate().is_err());
    }
}
