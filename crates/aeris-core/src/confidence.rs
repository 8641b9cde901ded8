//! Confidence score in [0, 1] for a finished analysis.
//!
//! Product of three factors, capped by a ceiling that depends on whether the
//! data is simulated:
//!   - count: `n / (n + saturation_count)`, saturating toward 1
//!   - homogeneity: `1 − min(max_std_penalty, std / std_scale_db)`
//!   - baseline: 1 with a baseline, `missing_baseline_factor` without

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceConfig {
    pub saturation_count: f64,
    pub std_scale_db: f64,
    pub max_std_penalty: f64,
    pub missing_baseline_factor: f64,
    pub simulated_ceiling: f64,
    pub real_ceiling: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            saturation_count: 100.0,
            std_scale_db: 6.0,
            max_std_penalty: 0.5,
            missing_baseline_factor: 0.9,
            simulated_ceiling: 0.9,
            real_ceiling: 1.0,
        }
    }
}

impl ConfidenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(self.saturation_count > 0.0) || !(self.std_scale_db > 0.0) {
            return Err(ConfigError::Invalid(
                "confidence saturation_count and std_scale_db must be positive".into(),
            ));
        }
        if !unit(self.max_std_penalty)
            || !unit(self.missing_baseline_factor)
            || !unit(self.simulated_ceiling)
            || !unit(self.real_ceiling)
        {
            return Err(ConfigError::Invalid(
                "confidence factors and ceilings must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Unrounded confidence score.
pub fn confidence_score(
    cfg: &ConfidenceConfig,
    pixel_count: u64,
    std_db: f64,
    has_baseline: bool,
    simulated: bool,
) -> f64 {
    let n = pixel_count as f64;
    let count_factor = n / (n + cfg.saturation_count);
    let std_db = if std_db.is_finite() { std_db.max(0.0) } else { cfg.std_scale_db };
    let homogeneity = 1.0 - (std_db / cfg.std_scale_db).min(cfg.max_std_penalty);
    let baseline_factor = if has_baseline { 1.0 } else { cfg.missing_baseline_factor };
    let ceiling = if simulated { cfg.simulated_ceiling } else { cfg.real_ceiling };

    (count_factor * homogeneity * baseline_factor).clamp(0.0, ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_data_is_capped() {
        let c = confidence_score(&ConfidenceConfig::default(), 1_000_000, 0.0, true, true);
        assert!((c - 0.9).abs() < 1e-12, "got {c}");
        let r = confidence_score(&ConfidenceConfig::default(), 1_000_000, 0.0, true, false);
        assert!(r > 0.99 && r <= 1.0, "got {r}");
    }

    #[test]
    fn count_factor_is_monotonic() {
        let cfg = ConfidenceConfig::default();
        let mut prev = 0.0;
        for n in [0, 1, 10, 100, 1000, 10_000] {
            let c = confidence_score(&cfg, n, 1.0, true, false);
            assert!(c >= prev, "n = {n}: {c} < {prev}");
            prev = c;
        }
        assert_eq!(confidence_score(&cfg, 0, 1.0, true, false), 0.0);
    }

    #[test]
    fn high_spread_halves_at_most() {
        let cfg = ConfidenceConfig::default();
        let tight = confidence_score(&cfg, 1_000_000, 0.0, true, false);
        let noisy = confidence_score(&cfg, 1_000_000, 50.0, true, false);
        assert!((noisy - tight * 0.5).abs() < 1e-9, "tight {tight}, noisy {noisy}");
    }

    #[test]
    fn missing_baseline_lowers_confidence() {
        let cfg = ConfidenceConfig::default();
        let with = confidence_score(&cfg, 500, 2.0, true, false);
        let without = confidence_score(&cfg, 500, 2.0, false, false);
        assert!((without - with * 0.9).abs() < 1e-12);
    }

    #[test]
    fn always_in_unit_interval() {
        let cfg = ConfidenceConfig::default();
        for n in [0, 5, 5000] {
            for std in [0.0, 3.0, f64::NAN, f64::INFINITY] {
                for (b, s) in [(true, true), (false, false)] {
                    let c = confidence_score(&cfg, n, std, b, s);
                    assert!((0.0..=1.0).contains(&c), "n {n} std {std}: {c}");
                }
            }
        }
    }
}
