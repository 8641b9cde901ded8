//! Speckle smoothing for simulated samples.
//!
//! A 1-D moving window over the sample in scan order. The window is truncated
//! at the ends, so the output always has the input's length. Real raster
//! samples are never passed through here.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeckleKernel {
    /// Adaptive Lee filter: keeps edges where local variance is high.
    #[default]
    Lee,
    /// Plain moving average.
    Boxcar,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeckleConfig {
    /// Default policy; a request may override it.
    pub enabled: bool,
    pub kernel: SpeckleKernel,
    /// Odd window size, at least 3.
    pub window: usize,
}

impl Default for SpeckleConfig {
    fn default() -> Self {
        Self { enabled: true, kernel: SpeckleKernel::Lee, window: 5 }
    }
}

impl SpeckleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 3 || self.window % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "speckle window must be odd and >= 3, got {}",
                self.window
            )));
        }
        Ok(())
    }
}

/// Smooth `values` with the given kernel and window.
pub fn smooth(values: &[f64], kernel: SpeckleKernel, window: usize) -> Vec<f64> {
    let n = values.len();
    if n < 2 || window < 2 {
        return values.to_vec();
    }
    let half = window / 2;

    let overall_var = match kernel {
        SpeckleKernel::Lee => population_variance(values),
        SpeckleKernel::Boxcar => 0.0,
    };

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let win = &values[lo..hi];
            let local_mean = win.iter().sum::<f64>() / win.len() as f64;
            match kernel {
                SpeckleKernel::Boxcar => local_mean,
                SpeckleKernel::Lee => {
                    let local_var = population_variance(win);
                    let denom = local_var + overall_var;
                    let k = if denom > 0.0 { local_var / denom } else { 0.0 };
                    local_mean + k * (values[i] - local_mean)
                }
            }
        })
        .collect()
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
