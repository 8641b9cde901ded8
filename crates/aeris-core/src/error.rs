//! Error taxonomy for the analysis pipeline.
//!
//! Every failure surfaces as a whole `AnalysisError`; the engine never
//! returns a partially filled statistics record.

use serde::Serialize;
use thiserror::Error;

/// Failures of a single analysis request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The request JSON is malformed, has unknown fields or bad values.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The polygon ring is open, degenerate, self-intersecting or out of bounds.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("polygon area {area_km2:.3} km² exceeds the limit of {max_km2} km²")]
    AreaTooLarge { area_km2: f64, max_km2: f64 },
    #[error("polygon area {area_km2:.6} km² is below the minimum of {min_km2} km²")]
    AreaTooSmall { area_km2: f64, min_km2: f64 },
    /// Zero valid samples intersect the polygon for the date window.
    #[error("no backscatter data available: {0}")]
    NoDataAvailable(String),
    /// The statistical reducer was handed zero elements.
    #[error("cannot reduce an empty sample")]
    EmptySample,
    /// The sample source did not answer within the configured deadline.
    #[error("sampling timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
}

impl AnalysisError {
    /// Stable machine-readable code, used as `kind` in error JSON.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidRequest(_) => "INVALID_REQUEST",
            AnalysisError::InvalidGeometry(_) => "INVALID_GEOMETRY",
            AnalysisError::AreaTooLarge { .. } => "AREA_TOO_LARGE",
            AnalysisError::AreaTooSmall { .. } => "AREA_TOO_SMALL",
            AnalysisError::NoDataAvailable(_) => "NO_DATA_AVAILABLE",
            AnalysisError::EmptySample => "EMPTY_SAMPLE",
            AnalysisError::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Structured `{kind, message}` body for the caller.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            error: ErrorBody {
                kind: self.kind().to_string(),
                message: self.to_string(),
            },
        }
    }
}

/// Wire shape of a failed analysis: `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// Failures while loading or validating an `EngineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
