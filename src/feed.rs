// src/feed.rs
//
// Ingestion boundary for the upstream hazard feed.
//
// The feed is unreliable: documents arrive truncated, re-joined, or as a
// concatenation of bare records. Everything tolerant lives here; the
// engine only ever sees validated, finite-coordinate records.

use crate::types::{GeoPoint, HazardKind, HazardPoint, SpeedUnit, ZoneCorridor};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
struct RawFeed {
    #[serde(default)]
    cameras: Vec<RawCamera>,
    #[serde(default)]
    zones: Vec<RawZone>,
}

#[derive(Debug, Deserialize)]
struct RawCamera {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawZone {
    start_lat: Option<f64>,
    start_lon: Option<f64>,
    end_lat: Option<f64>,
    end_lon: Option<f64>,
    #[serde(default)]
    limit_kmh: Option<f64>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FeedStats {
    pub cameras_accepted: usize,
    pub corridors_accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Default)]
pub struct FeedSnapshot {
    pub hazards: Vec<HazardPoint>,
    pub corridors: Vec<ZoneCorridor>,
    pub stats: FeedStats,
}

pub fn load_feed(path: &str) -> Result<FeedSnapshot> {
    let text = fs::read_to_string(Path::new(path))
        .with_context(|| format!("reading hazard feed {}", path))?;
    Ok(parse_feed(&text))
}

/// Parse a feed document of any of the shapes seen in the wild: a single
/// `{cameras, zones}` object, several of them concatenated, or a stream
/// of bare camera/zone records. Unusable fragments are counted and
/// skipped, never fatal.
pub fn parse_feed(text: &str) -> FeedSnapshot {
    let mut snapshot = FeedSnapshot::default();

    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    loop {
        match stream.next() {
            None => break,
            Some(Ok(value)) => absorb_value(value, &mut snapshot),
            Some(Err(err)) => {
                // The stream cannot resync past a syntax error; whatever
                // follows the bad byte is lost.
                warn!(
                    "Unparseable feed fragment at byte {}: {}",
                    stream.byte_offset(),
                    err
                );
                snapshot.stats.rejected += 1;
                break;
            }
        }
    }

    info!(
        "Feed parsed: {} cameras, {} corridors, {} rejected",
        snapshot.stats.cameras_accepted,
        snapshot.stats.corridors_accepted,
        snapshot.stats.rejected
    );
    snapshot
}

fn absorb_value(value: Value, snapshot: &mut FeedSnapshot) {
    if value.get("cameras").is_some() || value.get("zones").is_some() {
        match serde_json::from_value::<RawFeed>(value) {
            Ok(raw) => {
                for camera in raw.cameras {
                    absorb_camera(camera, snapshot);
                }
                for zone in raw.zones {
                    absorb_zone(zone, snapshot);
                }
            }
            Err(err) => {
                warn!("Malformed feed document skipped: {}", err);
                snapshot.stats.rejected += 1;
            }
        }
    } else if value.get("start_lat").is_some() {
        match serde_json::from_value::<RawZone>(value) {
            Ok(zone) => absorb_zone(zone, snapshot),
            Err(err) => {
                warn!("Malformed zone record skipped: {}", err);
                snapshot.stats.rejected += 1;
            }
        }
    } else {
        match serde_json::from_value::<RawCamera>(value) {
            Ok(camera) => absorb_camera(camera, snapshot),
            Err(err) => {
                warn!("Malformed camera record skipped: {}", err);
                snapshot.stats.rejected += 1;
            }
        }
    }
}

fn absorb_camera(raw: RawCamera, snapshot: &mut FeedSnapshot) {
    match validate_camera(raw) {
        Some(hazard) => {
            snapshot.stats.cameras_accepted += 1;
            snapshot.hazards.push(hazard);
        }
        None => snapshot.stats.rejected += 1,
    }
}

fn absorb_zone(raw: RawZone, snapshot: &mut FeedSnapshot) {
    match validate_zone(raw) {
        Some(corridor) => {
            snapshot.stats.corridors_accepted += 1;
            snapshot.corridors.push(corridor);
        }
        None => snapshot.stats.rejected += 1,
    }
}

fn coordinate_in_range(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0
}

fn validate_camera(raw: RawCamera) -> Option<HazardPoint> {
    let (lat, lon) = match (raw.lat, raw.lon) {
        (Some(lat), Some(lon)) if coordinate_in_range(lat, lon) => (lat, lon),
        _ => {
            warn!(
                "Camera record rejected: unusable coordinates {:?},{:?}",
                raw.lat, raw.lon
            );
            return None;
        }
    };

    let kind = match raw.kind.as_deref() {
        None | Some("fixed") => HazardKind::Fixed,
        Some("average") | Some("average_zone") => HazardKind::AverageZoneCamera,
        Some(other) => {
            warn!("Camera record rejected: unknown kind {:?}", other);
            return None;
        }
    };

    let unit = match raw.unit.as_deref() {
        None | Some("kmh") | Some("km/h") => SpeedUnit::Kmh,
        Some("mph") => SpeedUnit::Mph,
        Some(other) => {
            warn!("Camera record rejected: unknown unit {:?}", other);
            return None;
        }
    };

    Some(HazardPoint::new(lat, lon, kind, unit))
}

fn validate_zone(raw: RawZone) -> Option<ZoneCorridor> {
    let (start, end) = match (raw.start_lat, raw.start_lon, raw.end_lat, raw.end_lon) {
        (Some(a), Some(b), Some(c), Some(d))
            if coordinate_in_range(a, b) && coordinate_in_range(c, d) =>
        {
            (GeoPoint::new(a, b), GeoPoint::new(c, d))
        }
        _ => {
            warn!("Zone record rejected: unusable endpoints");
            return None;
        }
    };

    let limit = match raw.limit_kmh {
        Some(limit) if limit.is_finite() && limit > 0.0 => limit,
        other => {
            warn!("Zone record rejected: unusable speed limit {:?}", other);
            return None;
        }
    };

    let corridor = ZoneCorridor::new(start, end, limit);
    // Coincident endpoints produce a zero-length corridor the membership
    // test can never satisfy.
    if corridor.start == corridor.end {
        warn!("Zone record rejected: coincident endpoints");
        return None;
    }

    Some(corridor)
}
