//! Summary statistics of a backscatter sample.

use serde::Serialize;

use crate::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n − 1); 0 for a single value.
    pub std_dev: f64,
    pub median: f64,
}

/// Reduce a non-empty slice of finite values.
pub fn summarize(values: &[f64]) -> Result<SummaryStats, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptySample);
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let std_dev = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    // Summation error can push the mean a hair outside [min, max] for
    // near-constant samples.
    let mean = mean.clamp(min, max);

    Ok(SummaryStats { count: n, mean, min, max, std_dev, median: median(values)? })
}

/// Median; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Result<f64, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptySample);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Ok(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}
