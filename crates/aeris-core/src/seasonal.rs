//! Latitude- and month-dependent backscatter offsets for the simulated sampler.
//!
//! Produces the mean σ0 a vegetated agricultural surface shows for a given
//! place and time:
//!   - Seasonal term: summer drier, winter wetter, mirrored between hemispheres
//!   - Regional term: tropical/subtropical belt drier, boreal belt wetter
//!   - Interannual term: configured drought years
//!
//! All values are in dB and add onto the base σ0.

use serde::{Deserialize, Serialize};

/// Offset applied to a specific calendar year (e.g. a known drought year).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearOffset {
    pub year: i32,
    pub offset_db: f64,
}

/// Parameters of the seasonal σ0 model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeasonalModel {
    /// σ0 of vegetated farmland under average conditions, VV (dB).
    pub base_sigma0_db: f64,
    /// Local-summer offset (Jun–Aug north, Dec–Feb south).
    pub summer_db: f64,
    /// Local-winter offset.
    pub winter_db: f64,
    /// Local-spring offset.
    pub spring_db: f64,
    /// Local-autumn offset.
    pub autumn_db: f64,
    /// |lat| below this is the tropical/subtropical belt.
    pub tropical_max_lat: f64,
    pub tropical_offset_db: f64,
    /// |lat| above this is the boreal belt.
    pub boreal_min_lat: f64,
    pub boreal_offset_db: f64,
    pub year_offsets: Vec<YearOffset>,
}

impl Default for SeasonalModel {
    fn default() -> Self {
        Self {
            base_sigma0_db: -10.0,
            summer_db: -2.5,
            winter_db: 1.5,
            spring_db: 0.5,
            autumn_db: -1.0,
            tropical_max_lat: 25.0,
            tropical_offset_db: -2.0,
            boreal_min_lat: 55.0,
            boreal_offset_db: 1.0,
            year_offsets: vec![
                YearOffset { year: 2022, offset_db: -1.5 },
                YearOffset { year: 2023, offset_db: -1.5 },
                YearOffset { year: 2024, offset_db: -0.5 },
            ],
        }
    }
}

/// Meteorological season at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

/// Local season for `month` (1–12). Latitude 0 counts as northern.
pub fn local_season(lat_deg: f64, month: u32) -> Season {
    let northern = match month {
        12 | 1 | 2 => Season::Winter,
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        _ => Season::Autumn,
    };
    if lat_deg >= 0.0 {
        northern
    } else {
        match northern {
            Season::Winter => Season::Summer,
            Season::Spring => Season::Autumn,
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
        }
    }
}

impl SeasonalModel {
    pub fn seasonal_offset_db(&self, lat_deg: f64, month: u32) -> f64 {
        match local_season(lat_deg, month) {
            Season::Winter => self.winter_db,
            Season::Spring => self.spring_db,
            Season::Summer => self.summer_db,
            Season::Autumn => self.autumn_db,
        }
    }

    pub fn regional_offset_db(&self, lat_deg: f64) -> f64 {
        let lat_abs = lat_deg.abs();
        if lat_abs < self.tropical_max_lat {
            self.tropical_offset_db
        } else if lat_abs > self.boreal_min_lat {
            self.boreal_offset_db
        } else {
            0.0
        }
    }

    pub fn year_offset_db(&self, year: i32) -> f64 {
        self.year_offsets
            .iter()
            .find(|y| y.year == year)
            .map_or(0.0, |y| y.offset_db)
    }

    /// Expected VV σ0 in dB before jitter, heterogeneity and speckle.
    pub fn expected_sigma0_db(&self, lat_deg: f64, month: u32, year: i32) -> f64 {
        self.base_sigma0_db
            + self.seasonal_offset_db(lat_deg, month)
            + self.regional_offset_db(lat_deg)
            + self.year_offset_db(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hemispheres_are_mirrored() {
        assert_eq!(local_season(38.0, 7), Season::Summer);
        assert_eq!(local_season(-38.0, 7), Season::Winter);
        assert_eq!(local_season(-38.0, 1), Season::Summer);
        assert_eq!(local_season(-38.0, 4), Season::Autumn);
        assert_eq!(local_season(0.0, 10), Season::Autumn);
    }

    /// Northern summer is drier than northern winter at the same site.
    #[test]
    fn summer_drier_than_winter() {
        let m = SeasonalModel::default();
        assert!(m.expected_sigma0_db(45.0, 7, 2019) < m.expected_sigma0_db(45.0, 1, 2019));
        assert!(m.expected_sigma0_db(-45.0, 1, 2019) < m.expected_sigma0_db(-45.0, 7, 2019));
    }

    #[test]
    fn regional_belts() {
        let m = SeasonalModel::default();
        assert_eq!(m.regional_offset_db(10.0), -2.0);
        assert_eq!(m.regional_offset_db(-10.0), -2.0);
        assert_eq!(m.regional_offset_db(40.0), 0.0);
        assert_eq!(m.regional_offset_db(60.0), 1.0);
        // Band edges are exclusive on both sides.
        assert_eq!(m.regional_offset_db(25.0), 0.0);
        assert_eq!(m.regional_offset_db(55.0), 0.0);
    }

    #[test]
    fn drought_year_lowers_expected_sigma0() {
        let m = SeasonalModel::default();
        let normal = m.expected_sigma0_db(38.0, 7, 2019);
        let drought = m.expected_sigma0_db(38.0, 7, 2023);
        assert!((normal - drought - 1.5).abs() < 1e-12);
    }

    /// Mid-latitude north, July 2023: −10 − 2.5 − 1.5 = −14 dB.
    #[test]
    fn seville_july_2023() {
        let m = SeasonalModel::default();
        assert!((m.expected_sigma0_db(38.0, 7, 2023) + 14.0).abs() < 1e-12);
    }
}
