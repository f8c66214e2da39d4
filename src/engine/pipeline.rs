// src/engine/pipeline.rs
//
// Orchestrator that wires together the visibility window, alert
// evaluator, and zone tracker.
//
// Single entry point: call ingest() once per position sample. The whole
// call is synchronous and runs to completion before the next sample;
// there are no internal timers, the cool-down ledgers compare against
// the sample's own timestamp.

use crate::catalog::HazardCatalog;
use crate::engine::alerts::{AlertConfig, AlertEvaluator};
use crate::engine::events::EngineEvent;
use crate::engine::metrics::EngineMetrics;
use crate::engine::visibility::{VisibilityConfig, VisibilityWindow};
use crate::engine::zone::{ZoneConfig, ZoneTracker};
use crate::geo::bearing_degrees;
use crate::types::{CorridorId, HazardId, HazardPoint, PositionSample, ZoneCorridor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub visibility: VisibilityConfig,
    pub alerts: AlertConfig,
    pub zones: ZoneConfig,
}

pub struct Engine {
    catalog: HazardCatalog,
    visibility: VisibilityWindow,
    alerts: AlertEvaluator,
    zones: ZoneTracker,
    last_position: Option<PositionSample>,
    last_speed_kmh: f64,
    metrics: EngineMetrics,
    sample_count: u64,
}

impl Engine {
    pub fn new(catalog: HazardCatalog) -> Self {
        Self::with_config(EngineConfig::default(), catalog)
    }

    pub fn with_config(config: EngineConfig, catalog: HazardCatalog) -> Self {
        Self {
            catalog,
            visibility: VisibilityWindow::new(config.visibility),
            alerts: AlertEvaluator::new(config.alerts),
            zones: ZoneTracker::new(config.zones),
            last_position: None,
            last_speed_kmh: 0.0,
            metrics: EngineMetrics::new(),
            sample_count: 0,
        }
    }

    /// Process one position sample through the whole pipeline. The
    /// returned events are ordered: visibility diff, then at most one
    /// alert, then zero-to-two zone events.
    pub fn ingest(&mut self, sample: PositionSample) -> Vec<EngineEvent> {
        self.sample_count += 1;
        self.metrics.inc(&self.metrics.samples_ingested);

        let mut events = Vec::new();
        let position = sample.position();
        let now_ms = sample.timestamp_ms;

        // 1. Speed: sticky fallback. A dropped speed field keeps the last
        //    known value instead of flickering to zero.
        let speed_kmh = match sample.speed_kmh {
            Some(s) if s.is_finite() => {
                self.last_speed_kmh = s;
                s
            }
            _ => self.last_speed_kmh,
        };

        // 2. Heading: device value when present, otherwise derived from
        //    the previous fix.
        let heading_deg = match sample.heading_deg {
            Some(h) if h.is_finite() => Some(h),
            _ => self
                .last_position
                .map(|prev| bearing_degrees(prev.position(), position)),
        };

        // 3. Visibility window.
        let diff = self.visibility.refresh(position, &self.catalog);
        self.metrics
            .add(&self.metrics.visibility_entries, diff.entered.len() as u64);
        self.metrics
            .add(&self.metrics.visibility_exits, diff.exited.len() as u64);
        if !diff.is_empty() {
            events.push(EngineEvent::VisibleSetChanged {
                entered: diff.entered,
                exited: diff.exited,
            });
        }

        // 4. Directional alert.
        if let Some(alert) = self
            .alerts
            .evaluate(position, heading_deg, &self.catalog, now_ms)
        {
            self.metrics.inc(&self.metrics.alerts_emitted);
            events.push(alert);
        }

        // 5. Average-speed zones.
        for event in self.zones.update(position, speed_kmh, &self.catalog, now_ms) {
            match &event {
                EngineEvent::ZoneEntered { .. } => self.metrics.inc(&self.metrics.zone_entries),
                EngineEvent::ZoneExited { .. } => self.metrics.inc(&self.metrics.zone_exits),
                _ => {}
            }
            events.push(event);
        }

        // 6. This sample becomes the reference for the next heading
        //    derivation.
        self.last_position = Some(sample);

        if self.sample_count % 200 == 0 {
            let summary = self.metrics.summary();
            info!(
                "📊 Engine: {} samples | {} visible | {} alerts | zones {}→{} | {:.1} Hz",
                summary.samples_ingested,
                self.visibility.visible_count(),
                summary.alerts_emitted,
                summary.zone_entries,
                summary.zone_exits,
                self.metrics.sample_rate_hz(),
            );
        }

        events
    }

    /// Swap in a fresh catalog snapshot. Cool-down ledgers and a live
    /// zone session survive the swap; the session is force-exited only
    /// when its corridor is gone from the new snapshot.
    pub fn reload_catalog(
        &mut self,
        hazards: Vec<HazardPoint>,
        corridors: Vec<ZoneCorridor>,
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let next = HazardCatalog::new(hazards, corridors);

        let orphaned = match self.zones.active_corridor() {
            Some(active) => !next.contains_corridor(active),
            None => false,
        };
        if orphaned {
            let now_ms = self.last_position.map(|p| p.timestamp_ms).unwrap_or(0.0);
            if let Some(exit) = self.zones.force_exit(now_ms) {
                self.metrics.inc(&self.metrics.zone_exits);
                events.push(exit);
            }
        }

        self.catalog = next;
        self.metrics.inc(&self.metrics.catalog_reloads);
        info!(
            "📦 Catalog reloaded: {} hazards, {} corridors",
            self.catalog.hazard_count(),
            self.catalog.corridor_count()
        );

        // Keep the visible set consistent with the new snapshot.
        if let Some(prev) = self.last_position {
            let diff = self.visibility.refresh(prev.position(), &self.catalog);
            self.metrics
                .add(&self.metrics.visibility_entries, diff.entered.len() as u64);
            self.metrics
                .add(&self.metrics.visibility_exits, diff.exited.len() as u64);
            if !diff.is_empty() {
                debug!(
                    "Reload changed visibility: +{} -{}",
                    diff.entered.len(),
                    diff.exited.len()
                );
                events.push(EngineEvent::VisibleSetChanged {
                    entered: diff.entered,
                    exited: diff.exited,
                });
            }
        }

        events
    }

    /// Hazards currently inside the visibility window. Read-only view
    /// for the map layer.
    pub fn visible(&self) -> &HashSet<HazardId> {
        self.visibility.visible()
    }

    pub fn active_corridor(&self) -> Option<&CorridorId> {
        self.zones.active_corridor()
    }

    pub fn catalog(&self) -> &HazardCatalog {
        &self.catalog
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}
