// src/engine/alerts.rs
//
// Direction-aware alert selection with per-hazard and global cool-downs.
//
// Policy: candidates within the alert radius are walked in ascending
// distance order and the first one to pass every gate fires, so "first
// qualifying" always means "nearest qualifying". At most one alert per
// ingested sample; while the global cool-down window is open the scan
// still runs but nothing fires.

use crate::catalog::HazardCatalog;
use crate::engine::events::EngineEvent;
use crate::geo::{angular_difference, bearing_degrees, distance_meters};
use crate::types::{GeoPoint, HazardId, HazardPoint};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alert radius. Tighter than the visibility radius: a hazard is
    /// drawn on the map long before it is worth interrupting the driver.
    pub alert_distance_m: f64,
    /// Minimum quiet period before the same hazard may alert again.
    pub per_hazard_throttle_ms: f64,
    /// Minimum quiet period before any hazard may alert again.
    pub global_throttle_ms: f64,
    /// Half-angle of the "ahead of travel" cone.
    pub ahead_angle_deg: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            alert_distance_m: 1_000.0,
            per_hazard_throttle_ms: 5_000.0,
            global_throttle_ms: 2_500.0,
            ahead_angle_deg: 60.0,
        }
    }
}

pub struct AlertEvaluator {
    config: AlertConfig,
    per_hazard_last_ms: HashMap<HazardId, f64>,
    last_global_ms: Option<f64>,
}

impl AlertEvaluator {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            per_hazard_last_ms: HashMap::new(),
            last_global_ms: None,
        }
    }

    /// Scan hazards near `position` and fire at most one alert.
    ///
    /// A missing heading treats every hazard as ahead (permissive
    /// fallback) rather than suppressing all alerts.
    pub fn evaluate(
        &mut self,
        position: GeoPoint,
        heading_deg: Option<f64>,
        catalog: &HazardCatalog,
        now_ms: f64,
    ) -> Option<EngineEvent> {
        let mut candidates: Vec<(f64, &HazardPoint)> = catalog
            .hazards()
            .iter()
            .filter_map(|hazard| {
                let distance = distance_meters(position, hazard.position);
                // NaN distances fail the comparison and drop out here.
                (distance <= self.config.alert_distance_m).then_some((distance, hazard))
            })
            .collect();

        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let globally_throttled = match self.last_global_ms {
            Some(last) => now_ms - last < self.config.global_throttle_ms,
            None => false,
        };

        for (distance, hazard) in candidates {
            if let Some(heading) = heading_deg {
                let bearing = bearing_degrees(position, hazard.position);
                let offset = angular_difference(bearing, heading);
                if offset > self.config.ahead_angle_deg {
                    debug!(
                        "Hazard {} rejected: {:.0}° off heading (limit {:.0}°)",
                        hazard.id, offset, self.config.ahead_angle_deg
                    );
                    continue;
                }
            }

            if let Some(last) = self.per_hazard_last_ms.get(&hazard.id) {
                if now_ms - last < self.config.per_hazard_throttle_ms {
                    debug!(
                        "Hazard {} rejected: in cool-down ({:.0}ms of {:.0}ms)",
                        hazard.id,
                        now_ms - last,
                        self.config.per_hazard_throttle_ms
                    );
                    continue;
                }
            }

            if globally_throttled {
                debug!(
                    "Hazard {} qualifies but global cool-down is open, no alert",
                    hazard.id
                );
                return None;
            }

            self.per_hazard_last_ms.insert(hazard.id.clone(), now_ms);
            self.last_global_ms = Some(now_ms);

            info!(
                "🔔 Alert: {} {} at {:.0} m",
                hazard.kind.as_str(),
                hazard.id,
                distance
            );

            return Some(EngineEvent::HazardAlert {
                hazard_id: hazard.id.clone(),
                kind: hazard.kind,
                distance_m: distance,
            });
        }

        None
    }

    pub fn last_alert_ms(&self, id: &HazardId) -> Option<f64> {
        self.per_hazard_last_ms.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HazardKind, HazardPoint, SpeedUnit};

    fn fixed(lat: f64, lon: f64) -> HazardPoint {
        HazardPoint::new(lat, lon, HazardKind::Fixed, SpeedUnit::Kmh)
    }

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::new(AlertConfig::default())
    }

    /// User at (38.999, 35.0); a camera ~111 m due north.
    fn north_camera_catalog() -> HazardCatalog {
        HazardCatalog::new(vec![fixed(39.0, 35.0)], vec![])
    }

    fn user() -> GeoPoint {
        GeoPoint::new(38.999, 35.0)
    }

    #[test]
    fn hazard_ahead_alerts() {
        let catalog = north_camera_catalog();
        let mut eval = evaluator();

        let event = eval.evaluate(user(), Some(0.0), &catalog, 1_000.0);
        match event {
            Some(EngineEvent::HazardAlert { distance_m, .. }) => {
                assert!(
                    (distance_m - 111.0).abs() < 2.0,
                    "expected ~111 m, got {:.1}",
                    distance_m
                );
            }
            other => panic!("expected HazardAlert, got {:?}", other),
        }
    }

    #[test]
    fn hazard_behind_never_alerts() {
        // Camera is due north; user heading due south (180° off).
        let catalog = north_camera_catalog();
        let mut eval = evaluator();

        for i in 0..20 {
            let now = 1_000.0 + i as f64 * 6_000.0; // outside every cool-down
            let event = eval.evaluate(user(), Some(180.0), &catalog, now);
            assert!(event.is_none(), "behind-hazard alert at t={}", now);
        }
    }

    #[test]
    fn missing_heading_is_permissive() {
        let catalog = north_camera_catalog();
        let mut eval = evaluator();

        let event = eval.evaluate(user(), None, &catalog, 1_000.0);
        assert!(event.is_some(), "no heading should still alert");
    }

    #[test]
    fn per_hazard_throttle_allows_one_alert() {
        let catalog = north_camera_catalog();
        let camera_id = catalog.hazards()[0].id.clone();
        let mut eval = evaluator();

        let first = eval.evaluate(user(), Some(0.0), &catalog, 1_000.0);
        let second = eval.evaluate(user(), Some(0.0), &catalog, 2_000.0);
        assert!(first.is_some());
        assert!(second.is_none(), "1 s later is inside the 5 s cool-down");
        assert_eq!(
            eval.last_alert_ms(&camera_id),
            Some(1_000.0),
            "suppressed attempt must not touch the ledger"
        );

        // Past the cool-down the hazard may fire again.
        let third = eval.evaluate(user(), Some(0.0), &catalog, 7_000.0);
        assert!(third.is_some());
    }

    #[test]
    fn nearest_qualifying_hazard_wins() {
        // Two cameras ahead: ~111 m and ~222 m north.
        let near = fixed(39.0, 35.0);
        let near_id = near.id.clone();
        let catalog = HazardCatalog::new(vec![fixed(39.001, 35.0), near], vec![]);
        let mut eval = evaluator();

        match eval.evaluate(user(), Some(0.0), &catalog, 1_000.0) {
            Some(EngineEvent::HazardAlert { hazard_id, .. }) => {
                assert_eq!(hazard_id, near_id, "nearest camera must fire first");
            }
            other => panic!("expected HazardAlert, got {:?}", other),
        }
    }

    #[test]
    fn global_throttle_spans_hazards() {
        // Nearest fires at t=1000; the second camera qualifies at t=2000
        // but the 2.5 s global window is still open. At t=4000 it fires.
        let catalog = HazardCatalog::new(vec![fixed(39.0, 35.0), fixed(39.001, 35.0)], vec![]);
        let mut eval = evaluator();

        assert!(eval.evaluate(user(), Some(0.0), &catalog, 1_000.0).is_some());
        assert!(eval.evaluate(user(), Some(0.0), &catalog, 2_000.0).is_none());
        assert!(eval.evaluate(user(), Some(0.0), &catalog, 4_000.0).is_some());
    }

    #[test]
    fn out_of_range_hazard_is_ignored() {
        // ~11 km north, well past the 1 km alert radius.
        let catalog = HazardCatalog::new(vec![fixed(39.1, 35.0)], vec![]);
        let mut eval = evaluator();

        assert!(eval.evaluate(user(), Some(0.0), &catalog, 1_000.0).is_none());
    }
}
