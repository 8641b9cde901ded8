//! Analysis orchestrator: runs every stage for one request in order.
//!
//! Pipeline order:
//!   1. Polygon validation and geodesic area
//!   2. Backscatter sampling (optionally under a deadline)
//!   3. Speckle smoothing (simulated samples only)
//!   4. Statistical reduction
//!   5. Severity classification and drought percentage
//!   6. Soil moisture index
//!   7. Baseline anomaly
//!   8. Confidence scoring
//!
//! Any failing stage aborts the whole request; there are no partial results.

use std::sync::Arc;

use log::debug;

use crate::baseline::{compare_to_baseline, BaselineTable};
use crate::cache::{CacheKey, ResultCache};
use crate::classify::{drought_percentage, legend, Legend};
use crate::confidence::confidence_score;
use crate::config::EngineConfig;
use crate::error::{AnalysisError, ConfigError};
use crate::geometry::validate_polygon;
use crate::moisture::soil_moisture_index;
use crate::report::{round_to, DroughtStatistics};
use crate::request::{AnalysisRequest, Polarization};
use crate::sampling::{CancelFlag, RasterSource, SampleSource, SimulatedSource, TimedSource};
use crate::speckle::smooth;
use crate::stats::summarize;

/// Stateless analysis engine. Holds read-only configuration, the baseline
/// table, the sample source and an optional result cache; safe to share
/// across threads.
pub struct DroughtEngine {
    config: EngineConfig,
    baselines: BaselineTable,
    source: Arc<dyn SampleSource>,
    cache: Option<ResultCache>,
}

impl DroughtEngine {
    /// Engine over the simulated sampler.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let source = Arc::new(SimulatedSource::new(config.simulation.clone()));
        Self::with_source(config, source)
    }

    /// Engine over observed scenes. `sampler.min_nominal_pixels` from the
    /// config overrides the source's coverage threshold.
    pub fn with_raster(config: EngineConfig, source: RasterSource) -> Result<Self, ConfigError> {
        let source = source.with_min_nominal_pixels(config.sampler.min_nominal_pixels);
        Self::with_source(config, Arc::new(source))
    }

    /// Engine over an arbitrary sample source. The source is used as given;
    /// sampler settings other than the timeout are not applied to it.
    pub fn with_source(config: EngineConfig, source: Arc<dyn SampleSource>) -> Result<Self, ConfigError> {
        config.validate()?;
        let baselines = config.baseline_table()?;
        Ok(Self { config, baselines, source, cache: None })
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn baselines(&self) -> &BaselineTable {
        &self.baselines
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn legend(&self, polarization: Polarization) -> Legend {
        legend(&self.config.thresholds, polarization)
    }

    /// Run the full pipeline, sampling on the calling thread.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<DroughtStatistics, AnalysisError> {
        self.run(request, self.source.as_ref())
    }

    /// Run the full pipeline with the configured sampling deadline.
    pub fn analyze_with_timeout(&self, request: &AnalysisRequest) -> Result<DroughtStatistics, AnalysisError> {
        let timed = TimedSource::new(Arc::clone(&self.source), self.config.sampler.timeout());
        self.run(request, &timed)
    }

    /// JSON request in, typed outcome out; see [`outcome_to_json`].
    pub fn analyze_json(&self, request_json: &str) -> Result<DroughtStatistics, AnalysisError> {
        let request = AnalysisRequest::from_json(request_json)?;
        self.analyze_with_timeout(&request)
    }

    /// Analyze several requests; results keep the input order.
    #[cfg(feature = "threading")]
    pub fn analyze_batch(&self, requests: &[AnalysisRequest]) -> Vec<Result<DroughtStatistics, AnalysisError>> {
        use rayon::prelude::*;
        requests.par_iter().map(|r| self.analyze_with_timeout(r)).collect()
    }

    /// Analyze several requests; results keep the input order.
    #[cfg(not(feature = "threading"))]
    pub fn analyze_batch(&self, requests: &[AnalysisRequest]) -> Vec<Result<DroughtStatistics, AnalysisError>> {
        requests.iter().map(|r| self.analyze_with_timeout(r)).collect()
    }

    fn run(&self, request: &AnalysisRequest, source: &dyn SampleSource) -> Result<DroughtStatistics, AnalysisError> {
        let cfg = &self.config;
        let pol = request.polarization;

        // ── 1. Polygon validation ───────────────────────────────────────────
        let polygon = validate_polygon(&request.ring, &cfg.area_limits)?;

        let speckle_requested = request.apply_speckle_filter.unwrap_or(cfg.speckle.enabled);
        let key = self.cache.as_ref().map(|_| {
            CacheKey::new(&polygon, request.date_range, pol, source.version(), speckle_requested)
        });
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                debug!("cache hit for {} {}", request.date_range, pol);
                return Ok(hit);
            }
        }

        // ── 2. Sampling ─────────────────────────────────────────────────────
        let mut sample = source.sample(&polygon, &request.date_range, pol, &CancelFlag::new())?;
        let flag = sample.quality_flag();

        // ── 3. Speckle smoothing ────────────────────────────────────────────
        if speckle_requested && flag.is_simulated() {
            let (kernel, window) = (cfg.speckle.kernel, cfg.speckle.window);
            sample = sample.map_values(|v| smooth(v, kernel, window));
        } else if speckle_requested {
            debug!("speckle filter skipped for {flag} sample");
        }

        // ── 4. Reduction ────────────────────────────────────────────────────
        let stats = summarize(sample.values())?;
        let mean = round_to(stats.mean, 2);

        // ── 5. Classification ───────────────────────────────────────────────
        let table = cfg.thresholds.for_polarization(pol);
        let severity = table.classify(mean);
        let drought_pct = drought_percentage(sample.values(), table);

        // ── 6. Soil moisture ────────────────────────────────────────────────
        let smi = soil_moisture_index(&cfg.moisture, mean, pol);

        // ── 7. Baseline anomaly ─────────────────────────────────────────────
        let comparison = compare_to_baseline(
            &self.baselines,
            polygon.centroid().lat,
            request.date_range.month(),
            pol,
            stats.mean,
        );

        // ── 8. Confidence ───────────────────────────────────────────────────
        let confidence = confidence_score(
            &cfg.confidence,
            sample.pixel_count(),
            stats.std_dev,
            comparison.is_some(),
            flag.is_simulated(),
        );

        let result = DroughtStatistics {
            mean_sigma0_db: mean,
            min_sigma0_db: round_to(stats.min, 2),
            max_sigma0_db: round_to(stats.max, 2),
            std_sigma0_db: round_to(stats.std_dev, 2),
            median_sigma0_db: round_to(stats.median, 2),
            drought_percentage: round_to(drought_pct, 1),
            drought_severity: severity,
            soil_moisture_index: round_to(smi, 1),
            anomaly_db: comparison.map(|(anomaly, _)| round_to(anomaly, 2)),
            baseline_mean_db: comparison.map(|(_, baseline)| round_to(baseline, 2)),
            confidence: round_to(confidence, 2),
            area_km2: round_to(polygon.area_km2(), 2),
            quality_flag: flag,
            polarization: pol,
            valid_pixel_count: sample.pixel_count(),
            scene_count: sample.scene_count(),
        };

        debug!(
            "{} {}: mean {:.2} dB → {}, {:.1}% drought, confidence {:.2}",
            request.date_range, pol, result.mean_sigma0_db, severity, result.drought_percentage, result.confidence
        );

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }
}

impl Default for DroughtEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            baselines: BaselineTable::builtin().clone(),
            source: Arc::new(SimulatedSource::new(config.simulation.clone())),
            config,
            cache: None,
        }
    }
}

/// Serialize an analysis outcome for the JSON boundary.
pub fn outcome_to_json(outcome: &Result<DroughtStatistics, AnalysisError>, pretty: bool) -> String {
    let text = match (outcome, pretty) {
        (Ok(stats), false) => serde_json::to_string(stats),
        (Ok(stats), true) => serde_json::to_string_pretty(stats),
        (Err(e), false) => serde_json::to_string(&e.to_report()),
        (Err(e), true) => serde_json::to_string_pretty(&e.to_report()),
    };
    text.unwrap_or_default()
}
