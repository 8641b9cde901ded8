//! Analysis request records and JSON boundary validation.
//!
//! The wire shape is parsed into private DTOs with `deny_unknown_fields`,
//! then converted into typed records. Geometry checks (closure, bounds,
//! self-intersection) belong to `geometry::validate_polygon`; this module
//! only rejects JSON that cannot describe a request at all.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::coords::LatLon;
use crate::error::AnalysisError;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Polarization ─────────────────────────────────────────────────────────────

/// Transmit/receive antenna combination of the radar return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Polarization {
    #[default]
    #[serde(rename = "VV")]
    Vv,
    #[serde(rename = "VH")]
    Vh,
}

impl Polarization {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarization::Vv => "VV",
            Polarization::Vh => "VH",
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarization {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VV" => Ok(Polarization::Vv),
            "VH" => Ok(Polarization::Vh),
            other => Err(AnalysisError::InvalidRequest(format!(
                "unknown polarization '{other}', expected VV or VH"
            ))),
        }
    }
}

// ── Date range ───────────────────────────────────────────────────────────────

/// Inclusive acquisition window. `start <= end` is enforced on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalysisError> {
        if start > end {
            return Err(AnalysisError::InvalidRequest(format!(
                "date_range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, AnalysisError> {
        Self::new(parse_date("start", start)?, parse_date("end", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Month (1–12) of the start date; selects seasonal model and baseline.
    pub fn month(&self) -> u32 {
        self.start.month()
    }

    /// Calendar year of the start date.
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the window, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AnalysisError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        AnalysisError::InvalidRequest(format!(
            "date_range.{field} '{value}' is not a YYYY-MM-DD date: {e}"
        ))
    })
}

// ── Request ──────────────────────────────────────────────────────────────────

/// A single analysis request, consumed once by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Exterior ring as given, first point expected to equal the last.
    pub ring: Vec<LatLon>,
    pub date_range: DateRange,
    pub polarization: Polarization,
    /// Per-request override of the configured speckle policy.
    pub apply_speckle_filter: Option<bool>,
}

impl AnalysisRequest {
    pub fn new(ring: Vec<LatLon>, date_range: DateRange, polarization: Polarization) -> Self {
        Self { ring, date_range, polarization, apply_speckle_filter: None }
    }

    pub fn with_speckle_filter(mut self, apply: bool) -> Self {
        self.apply_speckle_filter = Some(apply);
        self
    }

    /// Parse and validate the JSON request shape.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let dto: RequestDto = serde_json::from_str(json)
            .map_err(|e| AnalysisError::InvalidRequest(e.to_string()))?;
        dto.try_into()
    }

    /// Same as `from_json` for an already parsed value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, AnalysisError> {
        let dto: RequestDto = serde_json::from_value(value)
            .map_err(|e| AnalysisError::InvalidRequest(e.to_string()))?;
        dto.try_into()
    }
}

// ── Wire DTOs ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestDto {
    polygon: GeoJsonPolygon,
    date_range: DateRangeDto,
    #[serde(default)]
    polarization: Option<Polarization>,
    #[serde(default)]
    apply_speckle_filter: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GeoJsonPolygon {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<Vec<f64>>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DateRangeDto {
    start: String,
    end: String,
}

impl TryFrom<RequestDto> for AnalysisRequest {
    type Error = AnalysisError;

    fn try_from(dto: RequestDto) -> Result<Self, Self::Error> {
        if dto.polygon.kind != "Polygon" {
            return Err(AnalysisError::InvalidRequest(format!(
                "polygon.type must be \"Polygon\", got \"{}\"",
                dto.polygon.kind
            )));
        }
        let mut rings = dto.polygon.coordinates.into_iter();
        let exterior = rings.next().ok_or_else(|| {
            AnalysisError::InvalidRequest("polygon.coordinates has no exterior ring".into())
        })?;
        if rings.next().is_some() {
            return Err(AnalysisError::InvalidGeometry(
                "interior rings (holes) are not supported".into(),
            ));
        }

        let ring = exterior
            .into_iter()
            .enumerate()
            .map(|(i, pos)| match pos.as_slice() {
                // A third (altitude) component is allowed by GeoJSON and ignored.
                [lon, lat] | [lon, lat, _] => Ok(LatLon::from_lon_lat(*lon, *lat)),
                _ => Err(AnalysisError::InvalidRequest(format!(
                    "position {i} must be [lon, lat], got {} numbers",
                    pos.len()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let date_range = DateRange::parse(&dto.date_range.start, &dto.date_range.end)?;

        Ok(AnalysisRequest {
            ring,
            date_range,
            polarization: dto.polarization.unwrap_or_default(),
            apply_speckle_filter: dto.apply_speckle_filter,
        })
    }
}
