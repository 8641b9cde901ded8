//! Static seasonal baseline table keyed by latitude band, polarization and month.
//!
//! Loaded once (built-in or from config) and read-only afterwards. A missing
//! entry means "no baseline", never an implicit zero.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::request::Polarization;

/// Monthly mean σ0 (dB, VV) of Mediterranean farmland, January first.
const MEDITERRANEAN_VV_DB: [f64; 12] =
    [-9.5, -9.0, -9.5, -10.0, -10.5, -11.5, -12.5, -13.0, -12.0, -11.0, -10.0, -9.5];

/// Cross-pol returns sit roughly 6 dB below co-pol over farmland.
const VH_SHIFT_DB: f64 = -6.0;

static BUILTIN: Lazy<BaselineTable> = Lazy::new(|| {
    let north = MEDITERRANEAN_VV_DB.to_vec();
    // Southern hemisphere: same curve, six months out of phase.
    let south: Vec<f64> = (0..12).map(|m| MEDITERRANEAN_VV_DB[(m + 6) % 12]).collect();
    let shift = |v: &[f64]| v.iter().map(|db| db + VH_SHIFT_DB).collect::<Vec<_>>();

    BaselineTable {
        bands: vec![
            BaselineBand::new("northern-temperate", 30.0, 60.0, Polarization::Vv, north.clone()),
            BaselineBand::new("southern-temperate", -60.0, -30.0, Polarization::Vv, south.clone()),
            BaselineBand::new("northern-temperate", 30.0, 60.0, Polarization::Vh, shift(&north)),
            BaselineBand::new("southern-temperate", -60.0, -30.0, Polarization::Vh, shift(&south)),
        ],
    }
});

/// One latitude band of monthly baselines. Covers `min_lat <= lat < max_lat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineBand {
    pub name: String,
    pub min_lat: f64,
    pub max_lat: f64,
    #[serde(default)]
    pub polarization: Polarization,
    /// Twelve monthly means in dB, January first.
    pub monthly_db: Vec<f64>,
}

impl BaselineBand {
    pub fn new(
        name: impl Into<String>,
        min_lat: f64,
        max_lat: f64,
        polarization: Polarization,
        monthly_db: Vec<f64>,
    ) -> Self {
        Self { name: name.into(), min_lat, max_lat, polarization, monthly_db }
    }

    fn covers(&self, lat: f64, polarization: Polarization) -> bool {
        self.polarization == polarization && self.min_lat <= lat && lat < self.max_lat
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BaselineTable {
    bands: Vec<BaselineBand>,
}

impl BaselineTable {
    /// Validate and build a table. Each band needs 12 finite months and
    /// `min_lat < max_lat` within -90..=90.
    pub fn new(bands: Vec<BaselineBand>) -> Result<Self, ConfigError> {
        for band in &bands {
            if band.monthly_db.len() != 12 {
                return Err(ConfigError::Invalid(format!(
                    "baseline band '{}' has {} months, expected 12",
                    band.name,
                    band.monthly_db.len()
                )));
            }
            if band.monthly_db.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "baseline band '{}' contains a non-finite value",
                    band.name
                )));
            }
            if !(band.min_lat < band.max_lat)
                || band.min_lat < -90.0
                || band.max_lat > 90.0
            {
                return Err(ConfigError::Invalid(format!(
                    "baseline band '{}' has invalid latitude range {}..{}",
                    band.name, band.min_lat, band.max_lat
                )));
            }
        }
        Ok(Self { bands })
    }

    /// Table with no entries: every lookup yields `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared built-in table.
    pub fn builtin() -> &'static BaselineTable {
        &BUILTIN
    }

    pub fn bands(&self) -> &[BaselineBand] {
        &self.bands
    }

    /// Baseline mean σ0 for a latitude, month (1–12) and polarization.
    /// First matching band wins.
    pub fn lookup(&self, lat: f64, month: u32, polarization: Polarization) -> Option<f64> {
        if !(1..=12).contains(&month) {
            return None;
        }
        self.bands
            .iter()
            .find(|b| b.covers(lat, polarization))
            .map(|b| b.monthly_db[(month - 1) as usize])
    }
}

/// Anomaly of an observed mean against its baseline, if one exists.
/// Returns `(anomaly_db, baseline_mean_db)`.
pub fn compare_to_baseline(
    table: &BaselineTable,
    lat: f64,
    month: u32,
    polarization: Polarization,
    mean_sigma0_db: f64,
) -> Option<(f64, f64)> {
    table
        .lookup(lat, month, polarization)
        .map(|baseline| (mean_sigma0_db - baseline, baseline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_mediterranean_july() {
        let t = BaselineTable::builtin();
        assert_eq!(t.lookup(38.0, 7, Polarization::Vv), Some(-12.5));
        assert_eq!(t.lookup(38.0, 1, Polarization::Vv), Some(-9.5));
        assert_eq!(t.lookup(38.0, 7, Polarization::Vh), Some(-18.5));
    }

    #[test]
    fn southern_band_is_six_months_out_of_phase() {
        let t = BaselineTable::builtin();
        assert_eq!(t.lookup(-38.0, 1, Polarization::Vv), t.lookup(38.0, 7, Polarization::Vv));
        assert_eq!(t.lookup(-38.0, 8, Polarization::Vv), t.lookup(38.0, 2, Polarization::Vv));
    }

    #[test]
    fn tropics_and_poles_have_no_baseline() {
        let t = BaselineTable::builtin();
        assert_eq!(t.lookup(5.0, 7, Polarization::Vv), None);
        assert_eq!(t.lookup(70.0, 7, Polarization::Vv), None);
        assert_eq!(t.lookup(-75.0, 1, Polarization::Vh), None);
    }

    #[test]
    fn band_upper_edge_is_exclusive() {
        let t = BaselineTable::builtin();
        assert!(t.lookup(30.0, 3, Polarization::Vv).is_some());
        assert!(t.lookup(60.0, 3, Polarization::Vv).is_none());
    }

    #[test]
    fn invalid_month_is_none() {
        let t = BaselineTable::builtin();
        assert_eq!(t.lookup(38.0, 0, Polarization::Vv), None);
        assert_eq!(t.lookup(38.0, 13, Polarization::Vv), None);
    }

    #[test]
    fn anomaly_is_mean_minus_baseline() {
        let (anomaly, baseline) =
            compare_to_baseline(BaselineTable::builtin(), 38.0, 7, Polarization::Vv, -14.0).unwrap();
        assert_eq!(baseline, -12.5);
        assert!((anomaly + 1.5).abs() < 1e-12);
        assert!(compare_to_baseline(&BaselineTable::empty(), 38.0, 7, Polarization::Vv, -14.0).is_none());
    }

    #[test]
    fn new_rejects_short_month_list() {
        let band = BaselineBand::new("x", 0.0, 10.0, Polarization::Vv, vec![-10.0; 11]);
        assert!(BaselineTable::new(vec![band]).is_err());
    }

    #[test]
    fn new_rejects_inverted_latitudes() {
        let band = BaselineBand::new("x", 10.0, 0.0, Polarization::Vv, vec![-10.0; 12]);
        assert!(BaselineTable::new(vec![band]).is_err());
    }
}
