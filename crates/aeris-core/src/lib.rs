//! Sentinel-1 backscatter drought analysis engine.
//!
//! Stages, in pipeline order:
//!   geometry (validate + area) → sampling → speckle → stats →
//!   classify / moisture / baseline / confidence → report.
//!
//! `engine::DroughtEngine` runs the whole pipeline; every stage is also
//! usable on its own.

pub mod baseline;
pub mod cache;
pub mod classify;
pub mod confidence;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod moisture;
pub mod report;
pub mod request;
pub mod sampling;
pub mod seasonal;
pub mod speckle;
pub mod sphere;
pub mod stats;

pub use cache::ResultCache;
pub use classify::DroughtSeverity;
pub use config::EngineConfig;
pub use engine::DroughtEngine;
pub use error::{AnalysisError, ConfigError};
pub use report::DroughtStatistics;
pub use request::{AnalysisRequest, DateRange, Polarization};
pub use sampling::{
    BackscatterSample, QualityFlag, RasterScene, RasterSource, SampleSource, SimulatedSource, TimedSource,
};
