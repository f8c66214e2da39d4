// src/types.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub path: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: "data/hazards.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub input_dir: String,
    /// Log every Nth ZoneProgress event during replay (they fire on
    /// every in-zone sample and would otherwise drown the output).
    pub progress_log_every: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input_dir: "traces".to_string(),
            progress_log_every: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardKind {
    Fixed,
    AverageZoneCamera,
}

impl HazardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "FIXED",
            Self::AverageZoneCamera => "AVERAGE_ZONE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    Kmh,
    Mph,
}

/// Stable hazard identity derived from its coordinates.
///
/// Upstream feeds carry no id of their own, so identity is the (lat, lon)
/// pair rounded to 5 decimal places (~1 m). Two feed records closer than
/// that are the same camera.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HazardId(String);

impl HazardId {
    pub fn from_coords(lat: f64, lon: f64) -> Self {
        Self(format!("{:.5},{:.5}", lat, lon))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HazardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorridorId(String);

impl CorridorId {
    pub fn from_endpoints(start: GeoPoint, end: GeoPoint) -> Self {
        Self(format!(
            "{:.5},{:.5}>{:.5},{:.5}",
            start.lat, start.lon, end.lat, end.lon
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorridorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fixed or average-speed enforcement camera location. Immutable once
/// loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardPoint {
    pub id: HazardId,
    pub position: GeoPoint,
    pub kind: HazardKind,
    pub speed_unit: SpeedUnit,
}

impl HazardPoint {
    pub fn new(lat: f64, lon: f64, kind: HazardKind, speed_unit: SpeedUnit) -> Self {
        Self {
            id: HazardId::from_coords(lat, lon),
            position: GeoPoint::new(lat, lon),
            kind,
            speed_unit,
        }
    }
}

/// Straight-line approximation of an average-speed enforcement corridor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCorridor {
    pub id: CorridorId,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub speed_limit_kmh: f64,
}

impl ZoneCorridor {
    pub fn new(start: GeoPoint, end: GeoPoint, speed_limit_kmh: f64) -> Self {
        Self {
            id: CorridorId::from_endpoints(start, end),
            start,
            end,
            speed_limit_kmh,
        }
    }
}

/// One device position fix. Speed and heading are frequently absent on
/// real hardware and are backfilled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub speed_kmh: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    pub timestamp_ms: f64,
}

impl PositionSample {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}
