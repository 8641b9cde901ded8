//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! canonical behaviour. Unknown keys are rejected in every section to catch
//! typos.
//!
//! ```toml
//! [area_limits]
//! max_km2 = 50000.0
//!
//! [speckle]
//! kernel = "boxcar"
//! window = 7
//!
//! [sampler]
//! timeout_ms = 10000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::baseline::{BaselineBand, BaselineTable};
use crate::classify::SeverityThresholds;
use crate::confidence::ConfidenceConfig;
use crate::error::ConfigError;
use crate::geometry::AreaLimits;
use crate::moisture::MoistureReferences;
use crate::sampling::raster::DEFAULT_MIN_NOMINAL_PIXELS;
use crate::sampling::SimulationConfig;
use crate::speckle::SpeckleConfig;

/// Sampling deadline and coverage policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    pub timeout_ms: u64,
    /// Observed samples below this many valid pixels are `LOW_COVERAGE`.
    pub min_nominal_pixels: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000, min_nominal_pixels: DEFAULT_MIN_NOMINAL_PIXELS }
    }
}

impl SamplerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub area_limits: AreaLimits,
    pub thresholds: SeverityThresholds,
    pub moisture: MoistureReferences,
    pub speckle: SpeckleConfig,
    pub simulation: SimulationConfig,
    pub confidence: ConfidenceConfig,
    pub sampler: SamplerConfig,
    /// Replaces the built-in baseline table when present.
    pub baselines: Option<Vec<BaselineBand>>,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: EngineConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let AreaLimits { min_km2, max_km2 } = self.area_limits;
        if let Some(min) = min_km2 {
            if !(min.is_finite() && min >= 0.0) {
                return Err(ConfigError::Invalid(format!("area_limits.min_km2 must be >= 0, got {min}")));
            }
        }
        if let Some(max) = max_km2 {
            if !(max.is_finite() && max > 0.0) {
                return Err(ConfigError::Invalid(format!("area_limits.max_km2 must be > 0, got {max}")));
            }
            if min_km2.is_some_and(|min| min >= max) {
                return Err(ConfigError::Invalid("area_limits.min_km2 must be below max_km2".into()));
            }
        }
        if self.sampler.timeout_ms == 0 {
            return Err(ConfigError::Invalid("sampler.timeout_ms must be positive".into()));
        }
        self.thresholds.validate()?;
        self.moisture.validate()?;
        self.speckle.validate()?;
        self.simulation.validate()?;
        self.confidence.validate()?;
        self.baseline_table()?;
        Ok(())
    }

    /// Baseline table in effect: configured bands or the built-in table.
    pub fn baseline_table(&self) -> Result<BaselineTable, ConfigError> {
        match &self.baselines {
            Some(bands) => BaselineTable::new(bands.clone()),
            None => Ok(BaselineTable::builtin().clone()),
        }
    }
}
