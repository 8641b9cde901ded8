//! Backscatter sampling: the `SampleSource` capability and its sample record.
//!
//! Sources:
//!   - `SimulatedSource`: deterministic seasonal model, flag `SIMULATED`
//!   - `RasterSource`: in-memory georeferenced scenes, flag `NOMINAL` / `LOW_COVERAGE`
//!   - `TimedSource`: wraps either with a deadline
//!
//! The quality flag is set once, here, and never changed downstream.

pub mod raster;
pub mod simulated;
pub mod timeout;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::geometry::ValidPolygon;
use crate::request::{DateRange, Polarization};

pub use raster::{RasterScene, RasterSource, SceneUnits};
pub use simulated::{SimulatedSource, SimulationConfig};
pub use timeout::TimedSource;

/// Provenance and coverage of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityFlag {
    /// Produced by the seasonal model, not observed.
    Simulated,
    /// Observed data with adequate coverage.
    Nominal,
    /// Observed data with few valid pixels.
    LowCoverage,
}

impl QualityFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityFlag::Simulated => "SIMULATED",
            QualityFlag::Nominal => "NOMINAL",
            QualityFlag::LowCoverage => "LOW_COVERAGE",
        }
    }

    pub fn is_simulated(self) -> bool {
        matches!(self, QualityFlag::Simulated)
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation shared between a timed wrapper and its source.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Finite σ0 values (dB) for one polygon, window and polarization.
#[derive(Debug, Clone, PartialEq)]
pub struct BackscatterSample {
    values: Vec<f64>,
    polarization: Polarization,
    pixel_count: u64,
    scene_count: usize,
    quality_flag: QualityFlag,
}

impl BackscatterSample {
    /// Drops non-finite values; fails with `NoDataAvailable` if none remain.
    /// `pixel_count` is the number of pixels the values stand for and is
    /// raised to at least the number of kept values.
    pub fn new(
        values: Vec<f64>,
        polarization: Polarization,
        pixel_count: u64,
        scene_count: usize,
        quality_flag: QualityFlag,
    ) -> Result<Self, AnalysisError> {
        let total = values.len();
        let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if values.len() < total {
            warn!("dropped {} non-finite backscatter values", total - values.len());
        }
        if values.is_empty() {
            return Err(AnalysisError::NoDataAvailable(
                "no finite backscatter values intersect the polygon".into(),
            ));
        }
        let pixel_count = pixel_count.max(values.len() as u64);
        Ok(Self { values, polarization, pixel_count, scene_count, quality_flag })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn polarization(&self) -> Polarization {
        self.polarization
    }

    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    pub fn scene_count(&self) -> usize {
        self.scene_count
    }

    pub fn quality_flag(&self) -> QualityFlag {
        self.quality_flag
    }

    /// Replace values with a same-length smoothed copy; metadata is kept.
    pub(crate) fn map_values(mut self, f: impl FnOnce(&[f64]) -> Vec<f64>) -> Self {
        let out = f(&self.values);
        debug_assert_eq!(out.len(), self.values.len());
        if out.len() == self.values.len() && out.iter().all(|v| v.is_finite()) {
            self.values = out;
        }
        self
    }
}

/// Anything that can produce a backscatter sample for a validated polygon.
pub trait SampleSource: Send + Sync {
    fn sample(
        &self,
        polygon: &ValidPolygon,
        date_range: &DateRange,
        polarization: Polarization,
        cancel: &CancelFlag,
    ) -> Result<BackscatterSample, AnalysisError>;

    /// Identifies the data a source returns; part of the result cache key.
    fn version(&self) -> String;
}

impl<S: SampleSource + ?Sized> SampleSource for Arc<S> {
    fn sample(
        &self,
        polygon: &ValidPolygon,
        date_range: &DateRange,
        polarization: Polarization,
        cancel: &CancelFlag,
    ) -> Result<BackscatterSample, AnalysisError> {
        (**self).sample(polygon, date_range, polarization, cancel)
    }

    fn version(&self) -> String {
        (**self).version()
    }
}
