//! End-to-end scenarios through the public engine API.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aeris_core::coords::LatLon;
use aeris_core::engine::outcome_to_json;
use aeris_core::geometry::ValidPolygon;
use aeris_core::sampling::{CancelFlag, SceneUnits};
use aeris_core::{
    AnalysisError, AnalysisRequest, BackscatterSample, DateRange, DroughtEngine, DroughtSeverity,
    DroughtStatistics, EngineConfig, Polarization, QualityFlag, RasterScene, RasterSource, SampleSource,
};
use chrono::NaiveDate;

fn ring(pts: &[(f64, f64)]) -> Vec<LatLon> {
    let mut r: Vec<LatLon> = pts.iter().map(|&(lon, lat)| LatLon::from_lon_lat(lon, lat)).collect();
    r.push(r[0]);
    r
}

fn seville() -> Vec<LatLon> {
    ring(&[(-6.0, 37.5), (-5.0, 37.5), (-5.0, 38.5), (-6.0, 38.5)])
}

fn july_2023() -> DateRange {
    DateRange::parse("2023-07-01", "2023-07-31").unwrap()
}

fn assert_invariants(s: &DroughtStatistics) {
    assert!(s.min_sigma0_db <= s.median_sigma0_db && s.median_sigma0_db <= s.max_sigma0_db, "{s:?}");
    assert!(s.min_sigma0_db <= s.mean_sigma0_db && s.mean_sigma0_db <= s.max_sigma0_db, "{s:?}");
    assert!((0.0..=100.0).contains(&s.drought_percentage));
    assert!((0.0..=100.0).contains(&s.soil_moisture_index));
    assert!((0.0..=1.0).contains(&s.confidence));
    assert!(s.std_sigma0_db >= 0.0);
    assert!(s.area_km2 > 0.0);
    assert_eq!(s.anomaly_db.is_some(), s.baseline_mean_db.is_some());
}

/// Single-scene raster over the Seville square, filled with `db`.
fn raster_engine(db: f64) -> DroughtEngine {
    let scene = RasterScene::filled(
        NaiveDate::from_ymd_opt(2023, 7, 14).unwrap(),
        Polarization::Vv,
        SceneUnits::Db,
        40,
        40,
        -6.5,
        -4.5,
        37.0,
        39.0,
        db,
    );
    let source = RasterSource::new(vec![scene]).unwrap();
    DroughtEngine::with_source(EngineConfig::default(), Arc::new(source)).unwrap()
}

#[test]
fn seville_july_2023_simulated() {
    let engine = DroughtEngine::default();
    let stats = engine
        .analyze(&AnalysisRequest::new(seville(), july_2023(), Polarization::Vv))
        .unwrap();

    assert_eq!(stats.quality_flag, QualityFlag::Simulated);
    assert!(
        matches!(stats.drought_severity, DroughtSeverity::Mild | DroughtSeverity::Moderate),
        "severity {:?} at mean {:.2} dB",
        stats.drought_severity,
        stats.mean_sigma0_db
    );
    assert!((9700.0..9900.0).contains(&stats.area_km2), "area {}", stats.area_km2);
    assert_eq!(stats.baseline_mean_db, Some(-12.5));
    assert!(stats.confidence <= 0.9);
    assert!(stats.scene_count > 0);
    assert_invariants(&stats);
}

#[test]
fn identical_requests_are_bit_identical() {
    let req = AnalysisRequest::new(seville(), july_2023(), Polarization::Vv);
    let a = DroughtEngine::default().analyze(&req).unwrap();
    let b = DroughtEngine::default().analyze(&req).unwrap();
    assert_eq!(a, b);
    assert_eq!(outcome_to_json(&Ok(a), false), outcome_to_json(&Ok(b), false));
}

#[test]
fn reversed_ring_gives_same_area() {
    let engine = DroughtEngine::default();
    let mut reversed = seville();
    reversed.reverse();
    let a = engine.analyze(&AnalysisRequest::new(seville(), july_2023(), Polarization::Vv)).unwrap();
    let b = engine.analyze(&AnalysisRequest::new(reversed, july_2023(), Polarization::Vv)).unwrap();
    assert_eq!(a.area_km2, b.area_km2);
}

#[test]
fn empty_raster_is_no_data_available() {
    let source = RasterSource::new(Vec::new()).unwrap();
    let engine = DroughtEngine::with_source(EngineConfig::default(), Arc::new(source)).unwrap();
    let err = engine
        .analyze(&AnalysisRequest::new(seville(), july_2023(), Polarization::Vv))
        .unwrap_err();
    assert_eq!(err.kind(), "NO_DATA_AVAILABLE");
}

#[test]
fn missing_baseline_serializes_null() {
    // Northern Norway and the Sahel sit outside the temperate bands.
    for pts in [
        [(20.0, 69.0), (21.0, 69.0), (21.0, 69.5), (20.0, 69.5)],
        [(2.0, 12.0), (2.5, 12.0), (2.5, 12.5), (2.0, 12.5)],
    ] {
        let outcome = DroughtEngine::default().analyze(&AnalysisRequest::new(ring(&pts), july_2023(), Polarization::Vv));
        let stats = outcome.as_ref().unwrap();
        assert_eq!(stats.anomaly_db, None);
        assert_eq!(stats.baseline_mean_db, None);
        assert_invariants(stats);

        let v: serde_json::Value = serde_json::from_str(&outcome_to_json(&outcome, false)).unwrap();
        assert!(v["anomaly_db"].is_null());
        assert!(v["baseline_mean_db"].is_null());
    }
}

#[test]
fn exact_threshold_belongs_to_more_severe_class() {
    let req = AnalysisRequest::new(seville(), july_2023(), Polarization::Vv);
    let cases = [
        (-10.0, DroughtSeverity::Mild),
        (-12.0, DroughtSeverity::Moderate),
        (-15.0, DroughtSeverity::Severe),
        (-18.0, DroughtSeverity::Extreme),
        (-9.5, DroughtSeverity::Normal),
    ];
    for (db, expected) in cases {
        let stats = raster_engine(db).analyze(&req).unwrap();
        assert_eq!(stats.mean_sigma0_db, db);
        assert_eq!(stats.drought_severity, expected, "at {db} dB");
        assert_eq!(stats.quality_flag, QualityFlag::Nominal);
    }
}

#[test]
fn raster_result_uses_observed_values() {
    let stats = raster_engine(-13.0)
        .analyze(&AnalysisRequest::new(seville(), july_2023(), Polarization::Vv))
        .unwrap();
    assert_eq!(stats.valid_pixel_count, 400);
    assert_eq!(stats.scene_count, 1);
    assert_eq!(stats.std_sigma0_db, 0.0);
    assert_eq!(stats.drought_percentage, 100.0);
    assert_eq!(stats.anomaly_db, Some(-0.5));
    assert_eq!(stats.soil_moisture_index, 0.0);
    // 400 / (400 + 100), full homogeneity, baseline present.
    assert_eq!(stats.confidence, 0.8);
}

#[test]
fn speckle_filter_is_never_applied_to_observed_data() {
    let mut scene = RasterScene::filled(
        NaiveDate::from_ymd_opt(2023, 7, 14).unwrap(),
        Polarization::Vv,
        SceneUnits::Db,
        40,
        40,
        -6.5,
        -4.5,
        37.0,
        39.0,
        -12.0,
    );
    for row in 0..40 {
        for col in 0..40 {
            if (row + col) % 2 == 0 {
                scene.set(row, col, -16.0);
            }
        }
    }
    let engine = DroughtEngine::with_source(
        EngineConfig::default(),
        Arc::new(RasterSource::new(vec![scene]).unwrap()),
    )
    .unwrap();
    let req = AnalysisRequest::new(seville(), july_2023(), Polarization::Vv);
    let on = engine.analyze(&req.clone().with_speckle_filter(true)).unwrap();
    let off = engine.analyze(&req.with_speckle_filter(false)).unwrap();
    assert_eq!(on, off);
}

#[test]
fn area_limits_surface_as_error_json() {
    let huge = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
    let outcome = DroughtEngine::default().analyze(&AnalysisRequest::new(huge, july_2023(), Polarization::Vv));
    let v: serde_json::Value = serde_json::from_str(&outcome_to_json(&outcome, false)).unwrap();
    assert_eq!(v["error"]["kind"], "AREA_TOO_LARGE");
    assert!(v["error"]["message"].as_str().unwrap().contains("km²"));
}

#[test]
fn request_json_end_to_end() {
    let json = r#"{
        "polygon": {"type": "Polygon", "coordinates": [[[-6.0, 37.5], [-5.0, 37.5], [-5.0, 38.5], [-6.0, 38.5], [-6.0, 37.5]]]},
        "date_range": {"start": "2023-07-01", "end": "2023-07-31"},
        "polarization": "VH"
    }"#;
    let stats = DroughtEngine::default().analyze_json(json).unwrap();
    assert_eq!(stats.polarization, Polarization::Vh);
    assert_invariants(&stats);
}

/// Sleeps until cancelled.
struct StalledSource;

impl SampleSource for StalledSource {
    fn sample(
        &self,
        _polygon: &ValidPolygon,
        _date_range: &DateRange,
        polarization: Polarization,
        cancel: &CancelFlag,
    ) -> Result<BackscatterSample, AnalysisError> {
        let start = Instant::now();
        while !cancel.is_cancelled() && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(5));
        }
        BackscatterSample::new(vec![-12.0], polarization, 1, 1, QualityFlag::Nominal)
    }

    fn version(&self) -> String {
        "stalled".into()
    }
}

#[test]
fn stalled_source_times_out() {
    let config = EngineConfig::from_toml_str("[sampler]\ntimeout_ms = 100\n").unwrap();
    let engine = DroughtEngine::with_source(config, Arc::new(StalledSource)).unwrap();
    let started = Instant::now();
    let err = engine
        .analyze_with_timeout(&AnalysisRequest::new(seville(), july_2023(), Polarization::Vv))
        .unwrap_err();
    assert_eq!(err, AnalysisError::Timeout { after_ms: 100 });
    assert!(started.elapsed() < Duration::from_secs(5));
}
