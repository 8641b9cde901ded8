//! Observed backscatter from georeferenced in-memory scenes.
//!
//! Each scene is a WGS84 lon/lat grid, row-major with row 0 at the northern
//! edge. Reprojection and file I/O happen before a scene reaches this module.
//! Multiple scenes in the window are composited by per-pixel median.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{BackscatterSample, CancelFlag, QualityFlag, SampleSource};
use crate::coords::LatLon;
use crate::error::AnalysisError;
use crate::geometry::ValidPolygon;
use crate::request::{DateRange, Polarization};
use crate::stats::median;

/// Samples with fewer valid pixels than this are flagged `LOW_COVERAGE`.
pub const DEFAULT_MIN_NOMINAL_PIXELS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SceneUnits {
    /// Linear power σ0; converted with 10·log10.
    #[default]
    Linear,
    /// Already in decibels.
    Db,
}

/// One acquisition on a regular lon/lat grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterScene {
    pub acquired: NaiveDate,
    #[serde(default)]
    pub polarization: Polarization,
    #[serde(default)]
    pub units: SceneUnits,
    pub width: usize,
    pub height: usize,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
    /// Values equal to this are treated as missing.
    #[serde(default)]
    pub nodata: Option<f64>,
    /// Row-major, row 0 = north.
    pub data: Vec<f64>,
}

impl RasterScene {
    /// Scene filled with `fill`.
    #[allow(clippy::too_many_arguments)]
    pub fn filled(
        acquired: NaiveDate,
        polarization: Polarization,
        units: SceneUnits,
        width: usize,
        height: usize,
        min_lon: f64,
        max_lon: f64,
        min_lat: f64,
        max_lat: f64,
        fill: f64,
    ) -> Self {
        Self {
            acquired,
            polarization,
            units,
            width,
            height,
            min_lon,
            max_lon,
            min_lat,
            max_lat,
            nodata: None,
            data: vec![fill; width * height],
        }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let Some(cells) = self.width.checked_mul(self.height) else {
            return Err(AnalysisError::InvalidRequest(format!(
                "scene {} grid {}×{} is too large",
                self.acquired, self.width, self.height
            )));
        };
        if cells == 0 || self.data.len() != cells {
            return Err(AnalysisError::InvalidRequest(format!(
                "scene {} has {} values for a {}×{} grid",
                self.acquired,
                self.data.len(),
                self.width,
                self.height
            )));
        }
        let bounds_ok = self.min_lon < self.max_lon
            && self.min_lat < self.max_lat
            && (-180.0..=180.0).contains(&self.min_lon)
            && (-180.0..=180.0).contains(&self.max_lon)
            && (-90.0..=90.0).contains(&self.min_lat)
            && (-90.0..=90.0).contains(&self.max_lat);
        if !bounds_ok {
            return Err(AnalysisError::InvalidRequest(format!(
                "scene {} has invalid bounds",
                self.acquired
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        self.data[row * self.width + col] = val;
    }

    fn pixel_height(&self) -> f64 {
        (self.max_lat - self.min_lat) / self.height as f64
    }

    fn pixel_width(&self) -> f64 {
        (self.max_lon - self.min_lon) / self.width as f64
    }

    pub fn pixel_center(&self, row: usize, col: usize) -> LatLon {
        LatLon::new(
            self.max_lat - (row as f64 + 0.5) * self.pixel_height(),
            self.min_lon + (col as f64 + 0.5) * self.pixel_width(),
        )
    }

    /// Pixel value in dB, or `None` for nodata, non-finite or non-positive
    /// linear values.
    pub fn value_db(&self, row: usize, col: usize) -> Option<f64> {
        let v = self.get(row, col);
        if !v.is_finite() || self.nodata.is_some_and(|nd| v == nd) {
            return None;
        }
        match self.units {
            SceneUnits::Db => Some(v),
            SceneUnits::Linear if v > 0.0 => Some(10.0 * v.log10()),
            SceneUnits::Linear => None,
        }
    }

    /// Rows whose pixel centres can fall within `[min_lat, max_lat]`.
    fn row_range(&self, min_lat: f64, max_lat: f64) -> std::ops::Range<usize> {
        let ph = self.pixel_height();
        let first = ((self.max_lat - max_lat) / ph - 0.5).floor().max(0.0) as usize;
        let last = ((self.max_lat - min_lat) / ph - 0.5).ceil().max(-1.0) + 1.0;
        first.min(self.height)..(last as usize).min(self.height)
    }
}

/// Sample source over a fixed set of scenes.
#[derive(Debug, Clone)]
pub struct RasterSource {
    scenes: Vec<RasterScene>,
    min_nominal_pixels: usize,
    version: String,
}

impl RasterSource {
    pub fn new(scenes: Vec<RasterScene>) -> Result<Self, AnalysisError> {
        for scene in &scenes {
            scene.validate()?;
        }
        let version = scenes_version(&scenes);
        Ok(Self { scenes, min_nominal_pixels: DEFAULT_MIN_NOMINAL_PIXELS, version })
    }

    /// Parse a JSON array of scenes.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let scenes: Vec<RasterScene> = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidRequest(format!("scene list: {e}")))?;
        Self::new(scenes)
    }

    pub fn with_min_nominal_pixels(mut self, n: usize) -> Self {
        self.min_nominal_pixels = n;
        self
    }

    pub fn scenes(&self) -> &[RasterScene] {
        &self.scenes
    }
}

impl SampleSource for RasterSource {
    fn sample(
        &self,
        polygon: &ValidPolygon,
        date_range: &DateRange,
        polarization: Polarization,
        cancel: &CancelFlag,
    ) -> Result<BackscatterSample, AnalysisError> {
        let selected: Vec<&RasterScene> = self
            .scenes
            .iter()
            .filter(|s| s.polarization == polarization && date_range.contains(s.acquired))
            .collect();
        if selected.is_empty() {
            return Err(AnalysisError::NoDataAvailable(format!(
                "no {polarization} scenes acquired {date_range}"
            )));
        }

        let bbox = polygon.bbox();
        // Pixel centre (quantized) → dB values across scenes.
        let mut stack: BTreeMap<(i64, i64), Vec<f64>> = BTreeMap::new();
        let mut scenes_used = 0;

        for scene in &selected {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Timeout { after_ms: 0 });
            }
            let mut hits = 0usize;
            for row in scene.row_range(bbox.min_lat, bbox.max_lat) {
                for col in 0..scene.width {
                    let centre = scene.pixel_center(row, col);
                    if !polygon.contains(centre) {
                        continue;
                    }
                    if let Some(db) = scene.value_db(row, col) {
                        stack.entry(centre.quantized()).or_default().push(db);
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                scenes_used += 1;
            }
            debug!("scene {}: {} valid pixels inside polygon", scene.acquired, hits);
        }

        let values = stack
            .into_values()
            .map(|px| median(&px))
            .collect::<Result<Vec<f64>, _>>()?;
        let flag = if values.len() >= self.min_nominal_pixels {
            QualityFlag::Nominal
        } else {
            QualityFlag::LowCoverage
        };
        if flag == QualityFlag::LowCoverage && !values.is_empty() {
            warn!(
                "low coverage: {} valid pixels (< {}) from {} scenes",
                values.len(),
                self.min_nominal_pixels,
                scenes_used
            );
        }

        let count = values.len() as u64;
        BackscatterSample::new(values, polarization, count, scenes_used, flag)
    }

    fn version(&self) -> String {
        self.version.clone()
    }
}

/// Content hash of the scene set, used in cache keys.
fn scenes_version(scenes: &[RasterScene]) -> String {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    let mut mix = |word: u64| {
        for b in word.to_le_bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
    };
    for s in scenes {
        mix(s.acquired.num_days_from_ce() as u64);
        mix(s.polarization as u64);
        mix(s.units as u64);
        mix(s.width as u64);
        mix(s.height as u64);
        for bound in [s.min_lon, s.max_lon, s.min_lat, s.max_lat] {
            mix(bound.to_bits());
        }
        mix(s.nodata.map_or(0, f64::to_bits));
        for v in &s.data {
            mix(v.to_bits());
        }
    }
    format!("raster-{}-{:016x}", scenes.len(), h)
}
