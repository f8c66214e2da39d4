// src/engine/events.rs
//
// Tagged output events. Collaborators (map renderer, alert UI, audio)
// consume these instead of reaching into engine state.

use crate::types::{CorridorId, HazardId, HazardKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineEvent {
    /// Hazards crossed the visibility radius since the previous sample.
    VisibleSetChanged {
        entered: Vec<HazardId>,
        exited: Vec<HazardId>,
    },

    /// A hazard ahead of travel passed every alert filter. At most one
    /// per ingested sample.
    HazardAlert {
        hazard_id: HazardId,
        kind: HazardKind,
        distance_m: f64,
    },

    ZoneEntered {
        corridor_id: CorridorId,
        limit_kmh: f64,
    },

    ZoneProgress {
        corridor_id: CorridorId,
        pct: f64,
        current_kmh: f64,
        limit_kmh: f64,
        over_by_kmh: f64,
    },

    ZoneExited {
        corridor_id: CorridorId,
        avg_kmh: f64,
        limit_kmh: f64,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VisibleSetChanged { .. } => "VISIBLE_SET_CHANGED",
            Self::HazardAlert { .. } => "HAZARD_ALERT",
            Self::ZoneEntered { .. } => "ZONE_ENTERED",
            Self::ZoneProgress { .. } => "ZONE_PROGRESS",
            Self::ZoneExited { .. } => "ZONE_EXITED",
        }
    }
}
