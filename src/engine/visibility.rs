// src/engine/visibility.rs
//
// Incremental in/out diffing of hazards against the visibility radius.
// Linear scan per sample: catalogs are bounded (tens of thousands of
// points) and samples arrive at a few Hz, so no spatial index. A grid or
// quad-tree can replace the scan without changing the interface.

use crate::catalog::HazardCatalog;
use crate::geo::distance_meters;
use crate::types::{GeoPoint, HazardId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Radius within which hazards are handed to the map layer.
    pub radius_m: f64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self { radius_m: 10_000.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisibilityDiff {
    pub entered: Vec<HazardId>,
    pub exited: Vec<HazardId>,
}

impl VisibilityDiff {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

pub struct VisibilityWindow {
    config: VisibilityConfig,
    visible: HashSet<HazardId>,
}

impl VisibilityWindow {
    pub fn new(config: VisibilityConfig) -> Self {
        Self {
            config,
            visible: HashSet::new(),
        }
    }

    /// Recompute the visible set against `position` and report the diff.
    ///
    /// A hazard with non-finite coordinates yields a NaN distance, fails
    /// every comparison, and stays inert.
    pub fn refresh(&mut self, position: GeoPoint, catalog: &HazardCatalog) -> VisibilityDiff {
        let mut diff = VisibilityDiff::default();
        let mut in_range: HashSet<HazardId> = HashSet::with_capacity(self.visible.len());

        for hazard in catalog.hazards() {
            let distance = distance_meters(position, hazard.position);
            if distance <= self.config.radius_m {
                if !self.visible.contains(&hazard.id) {
                    diff.entered.push(hazard.id.clone());
                }
                in_range.insert(hazard.id.clone());
            }
        }

        for id in &self.visible {
            if !in_range.contains(id) {
                diff.exited.push(id.clone());
            }
        }

        if !diff.is_empty() {
            debug!(
                "Visibility diff: +{} -{} ({} visible)",
                diff.entered.len(),
                diff.exited.len(),
                in_range.len()
            );
        }

        self.visible = in_range;
        diff
    }

    pub fn visible(&self) -> &HashSet<HazardId> {
        &self.visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }
}
