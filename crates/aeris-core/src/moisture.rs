//! Soil moisture index (0–100) from mean backscatter.
//!
//! Linear between a dry reference (index 0) and a wet reference (index 100)
//! per polarization, clamped at both ends.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::request::Polarization;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoistureReference {
    /// σ0 (dB) that maps to index 0.
    pub dry_db: f64,
    /// σ0 (dB) that maps to index 100.
    pub wet_db: f64,
}

impl MoistureReference {
    pub fn index(&self, sigma0_db: f64) -> f64 {
        if sigma0_db.is_nan() {
            return 0.0;
        }
        let t = (sigma0_db - self.dry_db) / (self.wet_db - self.dry_db);
        (100.0 * t).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MoistureReferences {
    pub vv: MoistureReference,
    pub vh: MoistureReference,
}

impl Default for MoistureReferences {
    fn default() -> Self {
        Self {
            vv: MoistureReference { dry_db: -12.0, wet_db: -8.0 },
            vh: MoistureReference { dry_db: -18.0, wet_db: -12.0 },
        }
    }
}

impl MoistureReferences {
    pub fn for_polarization(&self, polarization: Polarization) -> &MoistureReference {
        match polarization {
            Polarization::Vv => &self.vv,
            Polarization::Vh => &self.vh,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, r) in [("VV", self.vv), ("VH", self.vh)] {
            if !r.dry_db.is_finite() || !r.wet_db.is_finite() || r.dry_db >= r.wet_db {
                return Err(ConfigError::Invalid(format!(
                    "{name} moisture reference needs finite dry_db < wet_db, got {} / {}",
                    r.dry_db, r.wet_db
                )));
            }
        }
        Ok(())
    }
}

/// Soil moisture index for a mean σ0 and polarization.
pub fn soil_moisture_index(refs: &MoistureReferences, sigma0_db: f64, polarization: Polarization) -> f64 {
    refs.for_polarization(polarization).index(sigma0_db)
}
