//! Offline runner for the drought analysis engine.
//!
//! # Usage
//!
//! ```bash
//! aeris analyze --request request.json --pretty
//! aeris analyze --request request.json --scenes scenes.json --config aeris.toml
//! aeris analyze --request request.json --summary
//! aeris legend --polarization VH
//! aeris baselines --month 7
//! ```
//!
//! # Environment Variables
//!
//! - `AERIS_CONFIG`: TOML config path, same as `--config`
//! - `RUST_LOG`: log filter (default: info); logs go to stderr

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aeris_core::engine::outcome_to_json;
use aeris_core::{DroughtEngine, EngineConfig, Polarization, RasterSource};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aeris", about = "Sentinel-1 backscatter drought analysis")]
struct Args {
    /// Engine config (TOML). Defaults apply when omitted.
    #[arg(long, env = "AERIS_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one request JSON file and print the statistics JSON.
    Analyze {
        #[arg(short, long)]
        request: PathBuf,

        /// JSON array of raster scenes; without it the simulated sampler is used.
        #[arg(long)]
        scenes: Option<PathBuf>,

        #[arg(long)]
        pretty: bool,

        /// Print a one-paragraph summary instead of the statistics JSON.
        #[arg(long, conflicts_with = "pretty")]
        summary: bool,
    },
    /// Print the severity legend.
    Legend {
        #[arg(long, default_value = "VV")]
        polarization: Polarization,
    },
    /// Print the baseline table, or the values for one month.
    Baselines {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
}

#[derive(Serialize)]
struct MonthlyBaseline<'a> {
    name: &'a str,
    min_lat: f64,
    max_lat: f64,
    polarization: Polarization,
    month: u32,
    baseline_db: f64,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Analyze { request, scenes, pretty, summary } => {
            let output = if summary { Output::Summary } else { Output::Json { pretty } };
            let (text, ok) = analyze(config, &request, scenes.as_deref(), output)?;
            println!("{text}");
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Command::Legend { polarization } => {
            let engine = DroughtEngine::new(config)?;
            println!("{}", serde_json::to_string_pretty(&engine.legend(polarization))?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Baselines { month } => {
            println!("{}", baselines_json(&config, month)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => {
            let cfg = EngineConfig::from_path(p)
                .with_context(|| format!("loading config {}", p.display()))?;
            info!("loaded config from {}", p.display());
            Ok(cfg)
        }
        None => Ok(EngineConfig::default()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Output {
    Json { pretty: bool },
    /// Summary sentence on success; errors are still reported as JSON.
    Summary,
}

/// Returns the output text and whether the analysis succeeded.
fn analyze(config: EngineConfig, request: &Path, scenes: Option<&Path>, output: Output) -> Result<(String, bool)> {
    let request_json = std::fs::read_to_string(request)
        .with_context(|| format!("reading request {}", request.display()))?;

    let engine = match scenes {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenes {}", path.display()))?;
            let source = RasterSource::from_json(&text)?;
            info!("using {} raster scenes from {}", source.scenes().len(), path.display());
            DroughtEngine::with_raster(config, source)?
        }
        None => DroughtEngine::new(config)?,
    };

    let outcome = engine.analyze_json(&request_json);
    match &outcome {
        Ok(stats) => info!(
            "{} ({}), confidence {:.2}",
            stats.drought_severity, stats.quality_flag, stats.confidence
        ),
        Err(e) => warn!("analysis failed: {e}"),
    }
    let text = match (&outcome, output) {
        (Ok(stats), Output::Summary) => stats.summary(),
        (_, Output::Json { pretty }) => outcome_to_json(&outcome, pretty),
        (Err(_), Output::Summary) => outcome_to_json(&outcome, false),
    };
    Ok((text, outcome.is_ok()))
}

fn baselines_json(config: &EngineConfig, month: Option<u32>) -> Result<String> {
    let table = config.baseline_table()?;
    let json = match month {
        None => serde_json::to_string_pretty(&table)?,
        Some(m) => {
            let rows: Vec<MonthlyBaseline> = table
                .bands()
                .iter()
                .map(|b| MonthlyBaseline {
                    name: &b.name,
                    min_lat: b.min_lat,
                    max_lat: b.max_lat,
                    polarization: b.polarization,
                    month: m,
                    baseline_db: b.monthly_db[(m - 1) as usize],
                })
                .collect();
            serde_json::to_string_pretty(&rows)?
        }
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const REQUEST: &str = r#"{
        "polygon": {"type": "Polygon", "coordinates": [[[-6.0, 37.5], [-5.0, 37.5], [-5.0, 38.5], [-6.0, 38.5], [-6.0, 37.5]]]},
        "date_range": {"start": "2023-07-01", "end": "2023-07-31"}
    }"#;

    fn temp_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from(["aeris", "legend", "--polarization", "vh"]).unwrap();
        assert!(matches!(args.command, Command::Legend { polarization: Polarization::Vh }));
        assert!(Args::try_parse_from(["aeris", "baselines", "--month", "13"]).is_err());
    }

    #[test]
    fn analyze_simulated_request() {
        let req = temp_file(REQUEST);
        let (json, ok) = analyze(EngineConfig::default(), req.path(), None, Output::Json { pretty: false }).unwrap();
        assert!(ok);
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["quality_flag"], "SIMULATED");
    }

    #[test]
    fn analyze_reports_error_json() {
        let req = temp_file(r#"{"polygon": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [0, 0]]]}, "date_range": {"start": "2023-07-01", "end": "2023-07-31"}}"#);
        let (json, ok) = analyze(EngineConfig::default(), req.path(), None, Output::Json { pretty: true }).unwrap();
        assert!(!ok);
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["error"]["kind"], "INVALID_GEOMETRY");
    }

    #[test]
    fn analyze_with_raster_scenes() {
        let req = temp_file(REQUEST);
        let data = vec!["-16.0"; 40 * 40].join(",");
        let scenes = temp_file(&format!(
            r#"[{{"acquired": "2023-07-12", "units": "db", "width": 40, "height": 40,
                 "min_lon": -6.5, "max_lon": -4.5, "min_lat": 37.0, "max_lat": 39.0,
                 "data": [{data}]}}]"#
        ));
        let (json, ok) = analyze(EngineConfig::default(), req.path(), Some(scenes.path()), Output::Json { pretty: false }).unwrap();
        assert!(ok, "{json}");
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["quality_flag"], "NOMINAL");
        assert_eq!(v["drought_severity"], "SEVERE");
        assert_eq!(v["valid_pixel_count"], 400);
    }

    #[test]
    fn analyze_prints_summary_sentence() {
        let args = Args::try_parse_from(["aeris", "analyze", "-r", "req.json", "--summary"]).unwrap();
        assert!(matches!(args.command, Command::Analyze { summary: true, .. }));

        let req = temp_file(REQUEST);
        let (text, ok) = analyze(EngineConfig::default(), req.path(), None, Output::Summary).unwrap();
        assert!(ok);
        assert!(text.contains("km²"), "{text}");
        assert!(text.ends_with("(simulated data)."), "{text}");
    }

    #[test]
    fn baselines_for_one_month() {
        let json = baselines_json(&EngineConfig::default(), Some(7)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v[0]["baseline_db"], -12.5);
        assert_eq!(v.as_array().unwrap().len(), 4);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/aeris.toml"))).is_err());
    }
}
