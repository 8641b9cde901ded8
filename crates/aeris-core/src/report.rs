//! Output record of a successful analysis and its text summary.

use serde::{Deserialize, Serialize};

use crate::classify::DroughtSeverity;
use crate::request::Polarization;
use crate::sampling::QualityFlag;

/// Immutable result of one analysis. Values are rounded for presentation:
/// dB, area and confidence to 2 decimals; percentage and moisture index to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroughtStatistics {
    pub mean_sigma0_db: f64,
    pub min_sigma0_db: f64,
    pub max_sigma0_db: f64,
    pub std_sigma0_db: f64,
    pub median_sigma0_db: f64,
    pub drought_percentage: f64,
    pub drought_severity: DroughtSeverity,
    pub soil_moisture_index: f64,
    pub anomaly_db: Option<f64>,
    pub baseline_mean_db: Option<f64>,
    pub confidence: f64,
    pub area_km2: f64,
    pub quality_flag: QualityFlag,
    pub polarization: Polarization,
    pub valid_pixel_count: u64,
    pub scene_count: usize,
}

impl DroughtStatistics {
    pub fn to_json(&self) -> String {
        // Every field is a plain number, string or null.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// One-paragraph plain-language summary.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} conditions across {:.1} km²: mean {} backscatter {:.2} dB, \
             {:.1}% of the area at moderate drought or worse, soil moisture index {:.1}/100.",
            self.drought_severity.label(),
            self.area_km2,
            self.polarization,
            self.mean_sigma0_db,
            self.drought_percentage,
            self.soil_moisture_index,
        );
        match (self.anomaly_db, self.baseline_mean_db) {
            (Some(anomaly), Some(baseline)) => {
                let direction = if anomaly < 0.0 { "drier" } else { "wetter" };
                text.push_str(&format!(
                    " {:.2} dB {} than the seasonal baseline of {:.2} dB.",
                    anomaly.abs(),
                    direction,
                    baseline
                ));
            }
            _ => text.push_str(" No seasonal baseline is available for this location."),
        }
        text.push_str(&format!(" Confidence {:.0}%", self.confidence * 100.0));
        if self.quality_flag.is_simulated() {
            text.push_str(" (simulated data).");
        } else if self.quality_flag == QualityFlag::LowCoverage {
            text.push_str(" (low coverage).");
        } else {
            text.push('.');
        }
        text
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let r = (value * scale).round() / scale;
    // Avoid "-0.0" in the output.
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
