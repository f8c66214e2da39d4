// src/engine/mod.rs
//
// Real-time proximity/zone evaluation engine.
//
// Signal flow, one ingest() per position sample:
//   PositionSample → pipeline (speed/heading fallbacks)
//                    ├→ visibility → VisibleSetChanged
//                    ├→ alerts     → HazardAlert (at most one)
//                    └→ zone       → ZoneEntered / ZoneProgress / ZoneExited
//
// The engine is purely reactive: no timers, no background tasks, no I/O.
// Collaborators feed samples in and render the returned events.

pub mod alerts;
pub mod events;
pub mod metrics;
pub mod pipeline;
pub mod visibility;
pub mod zone;

// Re-exports for ergonomic access from main.rs
pub use alerts::{AlertConfig, AlertEvaluator};
pub use events::EngineEvent;
pub use metrics::{EngineMetrics, MetricsSummary};
pub use pipeline::{Engine, EngineConfig};
pub use visibility::{VisibilityConfig, VisibilityDiff, VisibilityWindow};
pub use zone::{ZoneConfig, ZoneTracker};
