//! Severity classification of backscatter values.
//!
//! Lower σ0 means drier soil and sparser canopy. Each polarization has its own
//! threshold table; the first matching class wins and an exact edge value
//! belongs to the more severe class.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::request::Polarization;

/// Ordered drought classes, `Normal < Mild < Moderate < Severe < Extreme`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroughtSeverity {
    Normal,
    Mild,
    Moderate,
    Severe,
    Extreme,
}

impl DroughtSeverity {
    pub const ALL: [DroughtSeverity; 5] = [
        DroughtSeverity::Normal,
        DroughtSeverity::Mild,
        DroughtSeverity::Moderate,
        DroughtSeverity::Severe,
        DroughtSeverity::Extreme,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DroughtSeverity::Normal => "NORMAL",
            DroughtSeverity::Mild => "MILD",
            DroughtSeverity::Moderate => "MODERATE",
            DroughtSeverity::Severe => "SEVERE",
            DroughtSeverity::Extreme => "EXTREME",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DroughtSeverity::Normal => "Normal",
            DroughtSeverity::Mild => "Mild drought",
            DroughtSeverity::Moderate => "Moderate drought",
            DroughtSeverity::Severe => "Severe drought",
            DroughtSeverity::Extreme => "Extreme drought",
        }
    }

    /// Map colour used by the frontend legend.
    pub fn color(self) -> &'static str {
        match self {
            DroughtSeverity::Normal => "#22c55e",
            DroughtSeverity::Mild => "#eab308",
            DroughtSeverity::Moderate => "#f97316",
            DroughtSeverity::Severe => "#ef4444",
            DroughtSeverity::Extreme => "#7c2d12",
        }
    }

    /// Counted toward `drought_percentage`.
    pub fn is_drought(self) -> bool {
        self >= DroughtSeverity::Moderate
    }
}

impl fmt::Display for DroughtSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Threshold tables ─────────────────────────────────────────────────────────

/// Lower bounds (exclusive) of the four non-extreme classes, in dB.
/// Must be strictly descending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdTable {
    pub normal_above: f64,
    pub mild_above: f64,
    pub moderate_above: f64,
    pub severe_above: f64,
}

impl ThresholdTable {
    pub const VV: ThresholdTable = ThresholdTable {
        normal_above: -10.0,
        mild_above: -12.0,
        moderate_above: -15.0,
        severe_above: -18.0,
    };

    pub const VH: ThresholdTable = ThresholdTable {
        normal_above: -15.0,
        mild_above: -18.0,
        moderate_above: -21.0,
        severe_above: -24.0,
    };

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let edges = [self.normal_above, self.mild_above, self.moderate_above, self.severe_above];
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} thresholds must be finite")));
        }
        if !edges.windows(2).all(|w| w[0] > w[1]) {
            return Err(ConfigError::Invalid(format!(
                "{name} thresholds must be strictly descending, got {edges:?}"
            )));
        }
        Ok(())
    }

    pub fn classify(&self, sigma0_db: f64) -> DroughtSeverity {
        if sigma0_db > self.normal_above {
            DroughtSeverity::Normal
        } else if sigma0_db > self.mild_above {
            DroughtSeverity::Mild
        } else if sigma0_db > self.moderate_above {
            DroughtSeverity::Moderate
        } else if sigma0_db > self.severe_above {
            DroughtSeverity::Severe
        } else {
            // NaN lands here too.
            DroughtSeverity::Extreme
        }
    }

    /// `(lower, upper]` dB bounds of a class; `None` means unbounded.
    pub fn range(&self, severity: DroughtSeverity) -> (Option<f64>, Option<f64>) {
        match severity {
            DroughtSeverity::Normal => (Some(self.normal_above), None),
            DroughtSeverity::Mild => (Some(self.mild_above), Some(self.normal_above)),
            DroughtSeverity::Moderate => (Some(self.moderate_above), Some(self.mild_above)),
            DroughtSeverity::Severe => (Some(self.severe_above), Some(self.moderate_above)),
            DroughtSeverity::Extreme => (None, Some(self.severe_above)),
        }
    }
}

/// Threshold tables for both polarizations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeverityThresholds {
    pub vv: ThresholdTable,
    pub vh: ThresholdTable,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self { vv: ThresholdTable::VV, vh: ThresholdTable::VH }
    }
}

impl SeverityThresholds {
    pub fn for_polarization(&self, polarization: Polarization) -> &ThresholdTable {
        match polarization {
            Polarization::Vv => &self.vv,
            Polarization::Vh => &self.vh,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.vv.validate("VV")?;
        self.vh.validate("VH")
    }

    pub fn classify(&self, sigma0_db: f64, polarization: Polarization) -> DroughtSeverity {
        self.for_polarization(polarization).classify(sigma0_db)
    }
}

/// Percentage (0–100) of samples classified MODERATE or worse.
/// Zero for an empty slice.
pub fn drought_percentage(values: &[f64], table: &ThresholdTable) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let dry = values.iter().filter(|&&v| table.classify(v).is_drought()).count();
    100.0 * dry as f64 / values.len() as f64
}

// ── Legend ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub severity: DroughtSeverity,
    pub label: &'static str,
    pub color: &'static str,
    /// Exclusive lower bound in dB, `null` for the open-ended class.
    pub min_db: Option<f64>,
    /// Inclusive upper bound in dB, `null` for the open-ended class.
    pub max_db: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub polarization: Polarization,
    pub entries: Vec<LegendEntry>,
}

/// Legend for one polarization, least severe first.
pub fn legend(thresholds: &SeverityThresholds, polarization: Polarization) -> Legend {
    let table = thresholds.for_polarization(polarization);
    let entries = DroughtSeverity::ALL
        .iter()
        .map(|&severity| {
            let (min_db, max_db) = table.range(severity);
            LegendEntry {
                severity,
                label: severity.label(),
                color: severity.color(),
                min_db,
                max_db,
            }
        })
        .collect();
    Legend { polarization, entries }
}
