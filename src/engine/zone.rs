// src/engine/zone.rs
//
// Average-speed corridor tracking. Two states: Idle and InZone.
//
// Corridor membership is a tolerance test on d(start,p) + d(p,end)
// against the corridor length, not an exact point-to-segment projection.
// The slack absorbs GPS jitter and slight corridor curvature.
//
// The active corridor is always evaluated first, so an overlapping
// corridor can never evict a live session. When the active corridor is
// lost and another matches on the same sample, exit and entry are
// emitted atomically, in that order.

use crate::catalog::HazardCatalog;
use crate::engine::events::EngineEvent;
use crate::geo::distance_meters;
use crate::types::{CorridorId, GeoPoint, ZoneCorridor};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Allowed slack in d(start,p) + d(p,end) vs. corridor length.
    pub gap_epsilon_m: f64,
    /// How far past the end point still counts as inside.
    pub overrun_epsilon_m: f64,
    /// Rolling speed buffer size; oldest samples drop first.
    pub speed_sample_cap: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            gap_epsilon_m: 60.0,
            overrun_epsilon_m: 30.0,
            speed_sample_cap: 80,
        }
    }
}

#[derive(Debug, Clone)]
struct ZoneSession {
    corridor_id: CorridorId,
    limit_kmh: f64,
    entered_at_ms: f64,
    speed_samples: VecDeque<f64>,
}

impl ZoneSession {
    fn new(corridor: &ZoneCorridor, now_ms: f64, cap: usize) -> Self {
        Self {
            corridor_id: corridor.id.clone(),
            limit_kmh: corridor.speed_limit_kmh,
            entered_at_ms: now_ms,
            speed_samples: VecDeque::with_capacity(cap),
        }
    }

    fn push_speed(&mut self, speed_kmh: f64, cap: usize) {
        if self.speed_samples.len() >= cap {
            self.speed_samples.pop_front();
        }
        self.speed_samples.push_back(speed_kmh);
    }

    fn average_kmh(&self) -> f64 {
        if self.speed_samples.is_empty() {
            return 0.0;
        }
        self.speed_samples.iter().sum::<f64>() / self.speed_samples.len() as f64
    }
}

#[derive(Debug, Clone)]
enum ZoneState {
    Idle,
    InZone(ZoneSession),
}

pub struct ZoneTracker {
    config: ZoneConfig,
    state: ZoneState,
}

impl ZoneTracker {
    pub fn new(config: ZoneConfig) -> Self {
        Self {
            config,
            state: ZoneState::Idle,
        }
    }

    /// Process one position sample. Emits zero, one, or two events
    /// (exit followed by entry when corridors hand over on one sample).
    pub fn update(
        &mut self,
        position: GeoPoint,
        speed_kmh: f64,
        catalog: &HazardCatalog,
        now_ms: f64,
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();

        // Active corridor first.
        let still_inside = match &self.state {
            ZoneState::InZone(session) => catalog
                .corridor(&session.corridor_id)
                .and_then(|c| self.progress_on(c, position)),
            ZoneState::Idle => None,
        };

        if let Some(pct) = still_inside {
            if let ZoneState::InZone(session) = &mut self.state {
                session.push_speed(speed_kmh, self.config.speed_sample_cap);
                let limit = session.limit_kmh;
                events.push(EngineEvent::ZoneProgress {
                    corridor_id: session.corridor_id.clone(),
                    pct,
                    current_kmh: speed_kmh,
                    limit_kmh: limit,
                    over_by_kmh: speed_kmh - limit,
                });
            }
            return events;
        }

        // Either Idle, or the active corridor was lost on this sample.
        if let Some(exit) = self.take_exit_event(now_ms) {
            events.push(exit);
        }
        if let Some(entered) = self.try_enter(position, catalog, now_ms) {
            events.push(entered);
        }

        events
    }

    /// Catalog reload dropped the active corridor: close the session with
    /// whatever samples were collected.
    pub fn force_exit(&mut self, now_ms: f64) -> Option<EngineEvent> {
        if matches!(self.state, ZoneState::InZone(_)) {
            warn!("Active corridor removed by catalog reload, forcing zone exit");
        }
        self.take_exit_event(now_ms)
    }

    pub fn active_corridor(&self) -> Option<&CorridorId> {
        match &self.state {
            ZoneState::InZone(session) => Some(&session.corridor_id),
            ZoneState::Idle => None,
        }
    }

    /// Fractional progress along `corridor` if `position` lies on it.
    fn progress_on(&self, corridor: &ZoneCorridor, position: GeoPoint) -> Option<f64> {
        let total = distance_meters(corridor.start, corridor.end);
        // Degenerate or non-finite corridors never match.
        if !(total > 0.0) {
            return None;
        }

        let d_start = distance_meters(corridor.start, position);
        let d_end = distance_meters(position, corridor.end);
        let gap = (d_start + d_end - total).abs();

        if gap < self.config.gap_epsilon_m && d_start <= total + self.config.overrun_epsilon_m {
            Some((d_start / total).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    fn try_enter(
        &mut self,
        position: GeoPoint,
        catalog: &HazardCatalog,
        now_ms: f64,
    ) -> Option<EngineEvent> {
        for corridor in catalog.corridors() {
            if self.progress_on(corridor, position).is_some() {
                info!(
                    "🛣️  Entered average-speed corridor {} (limit {:.0} km/h)",
                    corridor.id, corridor.speed_limit_kmh
                );
                self.state = ZoneState::InZone(ZoneSession::new(
                    corridor,
                    now_ms,
                    self.config.speed_sample_cap,
                ));
                return Some(EngineEvent::ZoneEntered {
                    corridor_id: corridor.id.clone(),
                    limit_kmh: corridor.speed_limit_kmh,
                });
            }
        }
        None
    }

    fn take_exit_event(&mut self, now_ms: f64) -> Option<EngineEvent> {
        match std::mem::replace(&mut self.state, ZoneState::Idle) {
            ZoneState::InZone(session) => {
                let avg_kmh = session.average_kmh();
                info!(
                    "🏁 Exited corridor {} after {:.1} s, average {:.1} km/h (limit {:.0})",
                    session.corridor_id,
                    (now_ms - session.entered_at_ms) / 1000.0,
                    avg_kmh,
                    session.limit_kmh
                );
                Some(EngineEvent::ZoneExited {
                    corridor_id: session.corridor_id,
                    avg_kmh,
                    limit_kmh: session.limit_kmh,
                })
            }
            ZoneState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ~11.1 km corridor due north along the 35°E meridian.
    fn corridor() -> ZoneCorridor {
        ZoneCorridor::new(GeoPoint::new(39.0, 35.0), GeoPoint::new(39.1, 35.0), 90.0)
    }

    fn catalog() -> HazardCatalog {
        HazardCatalog::new(vec![], vec![corridor()])
    }

    fn tracker() -> ZoneTracker {
        ZoneTracker::new(ZoneConfig::default())
    }

    #[test]
    fn enters_on_first_matching_sample() {
        let mut tracker = tracker();
        let events = tracker.update(GeoPoint::new(39.01, 35.0), 80.0, &catalog(), 0.0);

        assert_eq!(events.len(), 1);
        match &events[0] {
            EngineEvent::ZoneEntered { limit_kmh, .. } => assert_eq!(*limit_kmh, 90.0),
            other => panic!("expected ZoneEntered, got {:?}", other),
        }
        assert!(tracker.active_corridor().is_some());
    }

    #[test]
    fn off_corridor_position_does_not_enter() {
        // ~860 m lateral offset at mid-corridor: gap way past 60 m.
        let mut tracker = tracker();
        let events = tracker.update(GeoPoint::new(39.05, 35.01), 80.0, &catalog(), 0.0);
        assert!(events.is_empty());
        assert!(tracker.active_corridor().is_none());
    }

    #[test]
    fn small_lateral_jitter_stays_inside() {
        // ~100 m of lateral GPS jitter at mid-corridor keeps membership.
        let mut tracker = tracker();
        tracker.update(GeoPoint::new(39.01, 35.0), 80.0, &catalog(), 0.0);
        let events = tracker.update(GeoPoint::new(39.05, 35.00116), 80.0, &catalog(), 1_000.0);

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EngineEvent::ZoneProgress { .. }));
    }

    #[test]
    fn progress_is_monotonic_along_corridor() {
        let mut tracker = tracker();
        let cat = catalog();
        tracker.update(GeoPoint::new(39.005, 35.0), 85.0, &cat, 0.0);

        let mut last_pct = 0.0;
        for i in 1..=9 {
            let lat = 39.0 + 0.01 * i as f64;
            let events = tracker.update(GeoPoint::new(lat, 35.0), 85.0, &cat, i as f64 * 1_000.0);
            assert_eq!(events.len(), 1, "sample {} should emit one event", i);
            match &events[0] {
                EngineEvent::ZoneProgress { pct, .. } => {
                    assert!(
                        *pct >= last_pct,
                        "pct regressed at sample {}: {} < {}",
                        i,
                        pct,
                        last_pct
                    );
                    last_pct = *pct;
                }
                other => panic!("expected ZoneProgress, got {:?}", other),
            }
        }
        assert!(last_pct > 0.85, "final pct should be near the end");
    }

    #[test]
    fn exit_reports_mean_of_collected_speeds() {
        let mut tracker = tracker();
        let cat = catalog();

        tracker.update(GeoPoint::new(39.01, 35.0), 45.0, &cat, 0.0);
        tracker.update(GeoPoint::new(39.02, 35.0), 50.0, &cat, 1_000.0);
        tracker.update(GeoPoint::new(39.03, 35.0), 60.0, &cat, 2_000.0);
        tracker.update(GeoPoint::new(39.04, 35.0), 70.0, &cat, 3_000.0);

        // Far off the corridor: exit.
        let events = tracker.update(GeoPoint::new(39.5, 35.0), 70.0, &cat, 4_000.0);
        assert_eq!(events.len(), 1);
        match &events[0] {
            EngineEvent::ZoneExited { avg_kmh, .. } => {
                // Entry sample does not contribute, so the mean is of
                // [50, 60, 70].
                assert!(
                    (avg_kmh - 60.0).abs() < 1e-9,
                    "expected 60 km/h, got {}",
                    avg_kmh
                );
            }
            other => panic!("expected ZoneExited, got {:?}", other),
        }
        assert!(tracker.active_corridor().is_none());
    }

    #[test]
    fn overrun_tolerance_covers_the_end_point() {
        let mut tracker = tracker();
        let cat = catalog();
        tracker.update(GeoPoint::new(39.09, 35.0), 85.0, &cat, 0.0);

        // ~22 m past the end: still inside, pct clamps to 1.0.
        let events = tracker.update(GeoPoint::new(39.1002, 35.0), 85.0, &cat, 1_000.0);
        match &events[0] {
            EngineEvent::ZoneProgress { pct, .. } => assert_eq!(*pct, 1.0),
            other => panic!("expected ZoneProgress, got {:?}", other),
        }

        // ~111 m past the end: out.
        let events = tracker.update(GeoPoint::new(39.101, 35.0), 85.0, &cat, 2_000.0);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EngineEvent::ZoneExited { .. }));
    }

    #[test]
    fn corridor_handover_is_exit_then_enter() {
        let first = corridor();
        let second =
            ZoneCorridor::new(GeoPoint::new(39.1, 35.0), GeoPoint::new(39.2, 35.0), 70.0);
        let second_id = second.id.clone();
        let cat = HazardCatalog::new(vec![], vec![first, second]);
        let mut tracker = tracker();

        tracker.update(GeoPoint::new(39.05, 35.0), 80.0, &cat, 0.0);

        // Mid-way into the second corridor, clearly off the first.
        let events = tracker.update(GeoPoint::new(39.15, 35.0), 80.0, &cat, 1_000.0);
        assert_eq!(events.len(), 2, "handover must emit exit then enter");
        assert!(matches!(events[0], EngineEvent::ZoneExited { .. }));
        match &events[1] {
            EngineEvent::ZoneEntered { corridor_id, .. } => assert_eq!(*corridor_id, second_id),
            other => panic!("expected ZoneEntered, got {:?}", other),
        }
    }

    #[test]
    fn speed_buffer_is_bounded() {
        let config = ZoneConfig {
            speed_sample_cap: 3,
            ..ZoneConfig::default()
        };
        let mut tracker = ZoneTracker::new(config);
        let cat = catalog();

        tracker.update(GeoPoint::new(39.005, 35.0), 0.0, &cat, 0.0);
        // Five in-zone samples at 10..50; cap 3 keeps [30, 40, 50].
        for (i, speed) in [10.0, 20.0, 30.0, 40.0, 50.0].iter().enumerate() {
            tracker.update(
                GeoPoint::new(39.01 + 0.01 * i as f64, 35.0),
                *speed,
                &cat,
                (i + 1) as f64 * 1_000.0,
            );
        }

        let events = tracker.update(GeoPoint::new(39.5, 35.0), 50.0, &cat, 9_000.0);
        match &events[0] {
            EngineEvent::ZoneExited { avg_kmh, .. } => {
                assert!(
                    (avg_kmh - 40.0).abs() < 1e-9,
                    "expected mean of last 3 samples (40), got {}",
                    avg_kmh
                );
            }
            other => panic!("expected ZoneExited, got {:?}", other),
        }
    }

    #[test]
    fn force_exit_closes_the_session() {
        let mut tracker = tracker();
        let cat = catalog();
        tracker.update(GeoPoint::new(39.01, 35.0), 80.0, &cat, 0.0);
        tracker.update(GeoPoint::new(39.02, 35.0), 80.0, &cat, 1_000.0);

        let exit = tracker.force_exit(2_000.0);
        assert!(matches!(exit, Some(EngineEvent::ZoneExited { .. })));
        assert!(tracker.active_corridor().is_none());
        assert!(tracker.force_exit(3_000.0).is_none());
    }
}
